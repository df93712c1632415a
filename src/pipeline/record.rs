//! Record mapping: project a normalized submission onto the store schema.
//!
//! ## The remote conventions
//!
//! The record store addresses every cell by a field *code* and wraps every
//! single-value cell as `{"value": "..."}`. Repeated data lives in a
//! subtable field whose value is an ordered list of row wrappers, each row
//! again mapping field codes to wrapped cells. The field codes here are the
//! deployed app's Japanese codes and must match it byte-for-byte — a typo
//! does not fail locally, it surfaces as a validation error at submission
//! time.
//!
//! Checklist answers (`area`, `priority`) are stored in a single text cell,
//! joined with `", "`; the fact that they arrived as a list is not
//! representable in the remote schema and is lost on this projection.

use serde_json::{json, Map, Value};

use crate::submission::{FamilyMember, NormalizedSubmission};

/// A record in the store's wire shape: field code → wrapped value.
pub type ExternalRecord = Map<String, Value>;

/// Field code of the attachment field holding the rendered PDF.
pub const PDF_FIELD: &str = "PDFファイル";

/// Wrap a single value the way the store expects a cell.
fn cell(value: impl Into<String>) -> Value {
    json!({ "value": value.into() })
}

/// Project a normalized submission onto the store schema. Pure and total:
/// every field of the record set is emitted regardless of which optional
/// form sections were filled.
pub fn build_record(s: &NormalizedSubmission) -> ExternalRecord {
    let mut record = Map::new();
    let mut put = |code: &str, value: Value| {
        record.insert(code.to_string(), value);
    };

    // ── Applicant identity / contact / address ───────────────────────────
    put("申請者氏", cell(&s.last_name));
    put("申請者名", cell(&s.first_name));
    put("申請者氏フリガナ", cell(&s.last_name_kana));
    put("申請者名フリガナ", cell(&s.first_name_kana));
    put("郵便番号", cell(&s.postal_code));
    put("都道府県", cell(&s.prefecture));
    put("市区町村", cell(&s.city));
    put("番地", cell(&s.address));
    put("建物名", cell(&s.building));
    put("電話番号", cell(&s.phone));
    put("メールアドレス", cell(&s.email));

    // ── Migration intent ─────────────────────────────────────────────────
    put("移住人数", cell(&s.immigrant_count));
    put("申請者年齢", cell(&s.applicant_age));
    put("申請者職業", cell(&s.applicant_occupation));
    put("出身都道府県", cell(&s.birth_prefecture));
    put("出身市区町村", cell(&s.birth_city));
    put("移住希望時期", cell(&s.desired_time));
    put("日田市を選んだ理由", cell(&s.reason));
    put("やりたいこと", cell(&s.plans));
    put("就業形態", cell(&s.employment_type));
    put("相談内容", cell(&s.consultation));
    put("情報提供許可", cell(&s.mail_permission));

    // ── Vacant-house-bank preferences ────────────────────────────────────
    put("利用目的", cell(&s.usage_purpose));
    put("希望物件番号", cell(&s.property_number));
    put("希望地域", cell(s.area.joined()));
    put("取引種別", cell(&s.transaction_type));
    put("間取り希望", cell(&s.layout));
    put("駐車場台数", cell(&s.parking_spaces));
    put("ペット有無", cell(&s.has_pet));
    put("ペット種類", cell(&s.pet_type));
    put("ペット数", cell(&s.pet_count));
    put("ペット飼育場所", cell(&s.pet_location));
    put("その他希望条件", cell(&s.other_conditions));

    // ── Survey answers ───────────────────────────────────────────────────
    put("重要要件", cell(s.priority.joined()));
    put("場所希望", cell(&s.location));
    put("水道希望", cell(&s.water));
    put("建屋希望", cell(&s.building_type));
    put("階数希望", cell(&s.floors));
    put("温泉希望", cell(&s.onsen));
    put("菜園希望", cell(&s.garden));
    put("その他要件", cell(&s.survey_other));
    put("学校規模希望", cell(&s.school_size));

    // ── Family subtable ──────────────────────────────────────────────────
    put("家族", json!({ "value": family_rows(&s.family) }));

    record
}

/// Map the family sequence to subtable rows, preserving order.
fn family_rows(family: &[FamilyMember]) -> Vec<Value> {
    family
        .iter()
        .map(|m| {
            json!({
                "value": {
                    "家族氏": { "value": m.last_name },
                    "家族名": { "value": m.first_name },
                    "家族氏フリガナ": { "value": m.last_name_kana },
                    "家族名フリガナ": { "value": m.first_name_kana },
                    "続柄": { "value": m.relationship },
                    "年齢": { "value": m.age },
                    "職業": { "value": m.occupation },
                }
            })
        })
        .collect()
}

/// The partial record that points an existing record at an uploaded file.
pub fn attachment_patch(file_key: &str) -> ExternalRecord {
    let mut patch = Map::new();
    patch.insert(
        PDF_FIELD.to_string(),
        json!({ "value": [ { "fileKey": file_key } ] }),
    );
    patch
}

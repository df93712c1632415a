//! Markup construction: project a submission onto printable HTML.
//!
//! This is the pure half of the document renderer — it decides *what the
//! PDF says*. Section rules:
//!
//! * applicant identity/contact/address and migration-intent sections always
//!   render, empty cells included, so the office sees unanswered questions;
//! * the family table renders only when the member sequence is non-empty;
//! * the pet subsection renders only when the "has pet" answer equals the
//!   form's literal affirmative token — populated pet fields are otherwise
//!   suppressed entirely (a cleared checkbox must win over stale detail
//!   fields left in the payload);
//! * checklist answers render as their `", "`-joined projection.
//!
//! All user-supplied values pass through [`escape_html`]. The deployed form
//! interpolated them raw; a submission containing `<` would have produced a
//! broken (or worse, scripted) document.

use chrono::{DateTime, Local};

use crate::submission::{FamilyMember, NormalizedSubmission};

/// The literal "yes, we have a pet" answer the form submits.
pub const HAS_PET_YES: &str = "yes";

/// Document title, also used as the `<h1>` heading.
const TITLE: &str = "日田市移住定住相談フォーム";

/// Build the full HTML document for one submission.
///
/// `generated_at` is stamped into the header; the orchestrator passes the
/// render-time clock so tests can pin it.
pub fn build_markup(s: &NormalizedSubmission, generated_at: DateTime<Local>) -> String {
    let mut html = String::with_capacity(8 * 1024);

    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"UTF-8\">\n<style>\n",
    );
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str(&format!("<h1>{TITLE}</h1>\n"));
    html.push_str(&format!(
        "<div class=\"date\">受付日時: {}</div>\n",
        generated_at.format("%Y/%m/%d %H:%M:%S")
    ));

    // ── 申請者情報 ────────────────────────────────────────────────────────
    html.push_str("<h2>申請者情報</h2>\n");
    push_row(
        &mut html,
        "氏名",
        &format!("{} {}", s.last_name, s.first_name),
    );
    push_row(
        &mut html,
        "フリガナ",
        &format!("{} {}", s.last_name_kana, s.first_name_kana),
    );
    push_row(&mut html, "郵便番号", &s.postal_code);
    push_row(
        &mut html,
        "住所",
        &format!("{} {} {} {}", s.prefecture, s.city, s.address, s.building),
    );
    push_row(&mut html, "電話番号", &s.phone);
    push_row(&mut html, "メールアドレス", &s.email);

    // ── 移住情報 ──────────────────────────────────────────────────────────
    html.push_str("<h2>移住情報</h2>\n");
    push_row(&mut html, "移住人数", &format!("{}名", s.immigrant_count));
    push_row(&mut html, "申請者年齢", &format!("{}歳", s.applicant_age));
    push_row(&mut html, "申請者職業", &s.applicant_occupation);
    push_row(
        &mut html,
        "出身地",
        &format!("{} {}", s.birth_prefecture, s.birth_city),
    );

    if !s.family.is_empty() {
        html.push_str("<h2>家族構成</h2>\n");
        push_family_table(&mut html, &s.family);
    }

    // ── 移住に関する情報 ──────────────────────────────────────────────────
    html.push_str("<h2>移住に関する情報</h2>\n");
    push_row(&mut html, "移住希望時期", &s.desired_time);
    push_row(&mut html, "日田市を選んだ理由", &s.reason);
    push_row(&mut html, "やりたいこと", &s.plans);
    push_row(&mut html, "就業形態", &s.employment_type);
    push_row(&mut html, "相談内容", &s.consultation);
    push_row(&mut html, "情報提供許可", &s.mail_permission);

    // ── 空き家バンク情報 ──────────────────────────────────────────────────
    html.push_str("<h2>空き家バンク情報</h2>\n");
    push_row(&mut html, "利用目的", &s.usage_purpose);
    push_row(&mut html, "希望物件番号", &s.property_number);
    push_row(&mut html, "希望地域", &s.area.joined());
    push_row(&mut html, "取引種別", &s.transaction_type);
    push_row(&mut html, "間取り希望", &s.layout);
    push_row(&mut html, "駐車場", &format!("{}台", s.parking_spaces));
    push_row(&mut html, "ペット", &s.has_pet);
    if s.has_pet == HAS_PET_YES {
        push_row(&mut html, "ペット種類", &s.pet_type);
        push_row(&mut html, "ペット数", &format!("{}匹", s.pet_count));
        push_row(&mut html, "飼育場所", &s.pet_location);
    }
    push_row(&mut html, "その他希望条件", &s.other_conditions);

    // ── アンケート ────────────────────────────────────────────────────────
    html.push_str("<h2>アンケート</h2>\n");
    push_row(&mut html, "重要視する要件", &s.priority.joined());
    push_row(&mut html, "場所希望", &s.location);
    push_row(&mut html, "水道希望", &s.water);
    push_row(&mut html, "建屋希望", &s.building_type);
    push_row(&mut html, "階数希望", &s.floors);
    push_row(&mut html, "温泉希望", &s.onsen);
    push_row(&mut html, "菜園希望", &s.garden);
    push_row(&mut html, "その他要件", &s.survey_other);
    push_row(&mut html, "学校規模希望", &s.school_size);

    html.push_str("</body>\n</html>\n");
    html
}

/// One label/value line.
fn push_row(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "<div class=\"info-row\"><span class=\"label\">{}:</span><span class=\"value\">{}</span></div>\n",
        label,
        escape_html(value)
    ));
}

/// The family table: display name, reading, relationship, age, occupation.
fn push_family_table(html: &mut String, family: &[FamilyMember]) {
    html.push_str(
        "<table>\n<thead>\n<tr><th>No.</th><th>氏名</th><th>フリガナ</th>\
         <th>続柄</th><th>年齢</th><th>職業</th></tr>\n</thead>\n<tbody>\n",
    );
    for (i, m) in family.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}歳</td><td>{}</td></tr>\n",
            i + 1,
            escape_html(&format!("{} {}", m.last_name, m.first_name)),
            escape_html(&format!("{} {}", m.last_name_kana, m.first_name_kana)),
            escape_html(&m.relationship),
            escape_html(&m.age),
            escape_html(&m.occupation),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
}

/// Minimal HTML escaping for text nodes and attribute values.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Print stylesheet. Inline so the renderer needs no asset fetches.
const STYLE: &str = "\
body {
  font-family: 'Yu Gothic', 'Hiragino Kaku Gothic Pro', sans-serif;
  padding: 20px;
  line-height: 1.6;
}
h1 {
  color: #2c5282;
  border-bottom: 3px solid #2c5282;
  padding-bottom: 10px;
  text-align: center;
}
h2 {
  color: #2c5282;
  border-left: 4px solid #2c5282;
  padding-left: 10px;
  margin-top: 30px;
  margin-bottom: 15px;
  font-size: 18px;
}
table {
  width: 100%;
  border-collapse: collapse;
  margin-bottom: 20px;
}
th, td {
  border: 1px solid #ddd;
  padding: 8px;
  text-align: left;
}
th {
  background-color: #2c5282;
  color: white;
  font-weight: bold;
}
.info-row { margin-bottom: 10px; }
.label {
  font-weight: bold;
  color: #555;
  display: inline-block;
  width: 180px;
}
.value { display: inline-block; }
.date {
  text-align: right;
  color: #666;
  font-size: 12px;
  margin-bottom: 20px;
}
";

//! Field normalization: recover a typed submission from the flat key space.
//!
//! ## The index-suffix convention
//!
//! The form encodes the repeated family group as flat keys with a 1-based
//! numeric suffix: `familyLastName1`, `familyFirstName1`, …,
//! `familyLastName2`, and so on, added dynamically as the user clicks
//! "add member". There is no count field; the *presence of a non-empty
//! `familyLastName{i}`* is what marks row `i` as existing.
//!
//! ## Known limitation: first gap terminates the scan
//!
//! The scan probes indices in increasing order and stops at the first index
//! whose `familyLastName` key is absent or empty. Members submitted at
//! non-contiguous indices (1 and 3 but not 2) are silently dropped. This
//! matches the deployed form's renumbering behaviour and is preserved
//! deliberately — a renumbered payload and a malformed one are
//! indistinguishable on the server, and the consulting office reviews every
//! record by hand.

use crate::submission::{FamilyMember, NormalizedSubmission, RawSubmission};

/// Normalize a raw submission. Pure; never fails.
///
/// Every absent scalar defaults to the empty string; an absent family group
/// defaults to an empty sequence.
pub fn normalize(raw: &RawSubmission) -> NormalizedSubmission {
    NormalizedSubmission {
        last_name: raw.text("lastName"),
        first_name: raw.text("firstName"),
        last_name_kana: raw.text("lastNameKana"),
        first_name_kana: raw.text("firstNameKana"),
        postal_code: raw.text("postalCode"),
        prefecture: raw.text("prefecture"),
        city: raw.text("city"),
        address: raw.text("address"),
        building: raw.text("building"),
        phone: raw.text("phone"),
        email: raw.text("email"),

        immigrant_count: raw.text("immigrantCount"),
        applicant_age: raw.text("applicantAge"),
        applicant_occupation: raw.text("applicantOccupation"),
        birth_prefecture: raw.text("birthPrefecture"),
        birth_city: raw.text("birthCity"),
        desired_time: raw.text("desiredTime"),
        reason: raw.text("reason"),
        plans: raw.text("plans"),
        employment_type: raw.text("employmentType"),
        consultation: raw.text("consultation"),
        mail_permission: raw.text("mailPermission"),

        usage_purpose: raw.text("usagePurpose"),
        property_number: raw.text("propertyNumber"),
        area: raw.multi("area"),
        transaction_type: raw.text("transactionType"),
        layout: raw.text("layout"),
        parking_spaces: raw.text("parkingSpaces"),
        has_pet: raw.text("hasPet"),
        pet_type: raw.text("petType"),
        pet_count: raw.text("petCount"),
        pet_location: raw.text("petLocation"),
        other_conditions: raw.text("otherConditions"),

        priority: raw.multi("priority"),
        location: raw.text("location"),
        water: raw.text("water"),
        building_type: raw.text("buildingType"),
        floors: raw.text("floors"),
        onsen: raw.text("onsen"),
        garden: raw.text("garden"),
        survey_other: raw.text("surveyOther"),
        school_size: raw.text("schoolSize"),

        family: extract_family(raw),
    }
}

/// Scan the index-suffixed family group into an ordered sequence.
///
/// Probes `familyLastName{i}` for i = 1, 2, … and materializes a member for
/// every present index, reading the six companion keys with independent
/// empty-string defaults. Terminates at the first missing index — see the
/// module docs for why higher indices are *not* scanned past a gap.
fn extract_family(raw: &RawSubmission) -> Vec<FamilyMember> {
    let mut members = Vec::new();
    let mut index = 1usize;

    while raw.has_text(&format!("familyLastName{index}")) {
        members.push(FamilyMember {
            last_name: raw.text(&format!("familyLastName{index}")),
            first_name: raw.text(&format!("familyFirstName{index}")),
            last_name_kana: raw.text(&format!("familyLastNameKana{index}")),
            first_name_kana: raw.text(&format!("familyFirstNameKana{index}")),
            relationship: raw.text(&format!("familyRelationship{index}")),
            age: raw.text(&format!("familyAge{index}")),
            occupation: raw.text(&format!("familyOccupation{index}")),
        });
        index += 1;
    }

    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::MultiValue;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawSubmission {
        serde_json::from_value(v).expect("test input must be a JSON object")
    }

    #[test]
    fn scalars_default_to_empty() {
        let n = normalize(&raw(json!({})));
        assert_eq!(n.last_name, "");
        assert_eq!(n.has_pet, "");
        assert_eq!(n.area, MultiValue::Text(String::new()));
        assert!(n.family.is_empty());
    }

    #[test]
    fn contiguous_family_indices_all_materialize() {
        let n = normalize(&raw(json!({
            "familyLastName1": "山田", "familyFirstName1": "花子",
            "familyRelationship1": "配偶者", "familyAge1": "34",
            "familyLastName2": "山田", "familyFirstName2": "一郎",
            "familyRelationship2": "長男", "familyAge2": "8",
            "familyLastName3": "山田", "familyFirstName3": "桜",
        })));

        assert_eq!(n.family.len(), 3);
        assert_eq!(n.family[0].first_name, "花子");
        assert_eq!(n.family[1].age, "8");
        // Companion keys default independently
        assert_eq!(n.family[2].relationship, "");
        assert_eq!(n.family[2].occupation, "");
    }

    #[test]
    fn first_gap_terminates_the_scan() {
        let n = normalize(&raw(json!({
            "familyLastName1": "山田", "familyFirstName1": "花子",
            "familyLastName3": "山田", "familyFirstName3": "桜",
        })));

        // Index 2 is absent, so index 3 is unreachable.
        assert_eq!(n.family.len(), 1);
        assert_eq!(n.family[0].first_name, "花子");
    }

    #[test]
    fn empty_last_name_counts_as_a_gap() {
        let n = normalize(&raw(json!({
            "familyLastName1": "",
            "familyFirstName1": "花子",
            "familyLastName2": "山田",
        })));

        assert!(n.family.is_empty());
    }

    #[test]
    fn family_order_follows_index_order() {
        let n = normalize(&raw(json!({
            // Key order in the JSON object is irrelevant; index order rules.
            "familyLastName2": "乙", "familyLastName1": "甲",
        })));

        assert_eq!(n.family.len(), 2);
        assert_eq!(n.family[0].last_name, "甲");
        assert_eq!(n.family[1].last_name, "乙");
    }

    #[test]
    fn scalar_fields_map_by_exact_key() {
        let n = normalize(&raw(json!({
            "lastName": "山田", "firstName": "太郎",
            "postalCode": "877-0000", "hasPet": "yes",
            "area": ["中心部", "郊外"],
        })));

        assert_eq!(n.applicant_name(), "山田 太郎");
        assert_eq!(n.postal_code, "877-0000");
        assert_eq!(n.has_pet, "yes");
        assert_eq!(n.area.joined(), "中心部, 郊外");
    }
}

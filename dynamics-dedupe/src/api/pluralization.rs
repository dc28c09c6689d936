//! Entity set name derivation for the Dynamics 365 Web API
//!
//! The Web API addresses records through the entity set (collection) name,
//! which for most entities is the logical name in English plural form.
//! Entities that break the rules can set `entity_set` explicitly in config.

/// Derive the entity set name from an entity logical name
pub fn entity_set_name(logical_name: &str) -> String {
    if logical_name.is_empty() {
        return String::new();
    }

    let lower = logical_name.to_lowercase();

    if ["s", "x", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{}es", logical_name);
    }

    // consonant + y -> ies
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &logical_name[..logical_name.len() - 1]);
        }
    }

    format!("{}s", logical_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_entities() {
        assert_eq!(entity_set_name("account"), "accounts");
        assert_eq!(entity_set_name("contact"), "contacts");
        assert_eq!(entity_set_name("lead"), "leads");
        assert_eq!(entity_set_name("incident"), "incidents");
    }

    #[test]
    fn test_es_endings() {
        assert_eq!(entity_set_name("address"), "addresses");
        assert_eq!(entity_set_name("new_box"), "new_boxes");
        assert_eq!(entity_set_name("new_branch"), "new_branches");
    }

    #[test]
    fn test_y_endings() {
        assert_eq!(entity_set_name("opportunity"), "opportunities");
        assert_eq!(entity_set_name("new_survey"), "new_surveys");
    }

    #[test]
    fn test_empty() {
        assert_eq!(entity_set_name(""), "");
    }
}

//! Label derivation for cells, array items and add buttons.

use bunsen_types::Model;

use crate::path::is_index_segment;

/// `firstName` -> `First name`, `postal_code` -> `Postal code`
pub fn humanize(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let sentence = words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// English singular of a (usually plural) label
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["sses", "ches", "shes", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Label of a cell rendered at `id`
///
/// Explicit labels win, then the model title, then the humanized last
/// non-index segment of the id.
pub fn get_label(explicit: Option<&str>, model: Option<&Model>, id: &str) -> Option<String> {
    if let Some(label) = explicit {
        return Some(label.to_string());
    }
    if let Some(title) = model.and_then(|m| m.title.as_deref()) {
        return Some(title.to_string());
    }
    id.rsplit('.')
        .find(|segment| !segment.is_empty() && !is_index_segment(segment))
        .map(humanize)
}

/// `Addresses`, 0 -> `Address 1`
pub fn item_label(label: &str, index: usize) -> String {
    format!("{} {}", singularize(label), index + 1)
}

/// `Addresses` -> `Add address`
pub fn add_label(label: &str) -> String {
    format!("Add {}", singularize(label).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::ModelKind;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("firstName"), "First name");
        assert_eq!(humanize("postal_code"), "Postal code");
        assert_eq!(humanize("foo"), "Foo");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Addresses"), "Address");
        assert_eq!(singularize("Cities"), "City");
        assert_eq!(singularize("Boxes"), "Box");
        assert_eq!(singularize("Names"), "Name");
        assert_eq!(singularize("Status"), "Status");
        assert_eq!(singularize("Info"), "Info");
    }

    #[test]
    fn test_get_label_precedence() {
        let titled = Model {
            title: Some("Street Name".into()),
            ..Model::of_kind(ModelKind::String)
        };
        assert_eq!(
            get_label(Some("Custom"), Some(&titled), "street").as_deref(),
            Some("Custom")
        );
        assert_eq!(
            get_label(None, Some(&titled), "street").as_deref(),
            Some("Street Name")
        );
        assert_eq!(
            get_label(None, None, "addresses.0.firstName").as_deref(),
            Some("First name")
        );
        assert_eq!(get_label(None, None, ""), None);
    }

    #[test]
    fn test_item_and_add_labels() {
        assert_eq!(item_label("Addresses", 0), "Address 1");
        assert_eq!(item_label("Addresses", 1), "Address 2");
        assert_eq!(add_label("Addresses"), "Add address");
    }
}

use poi_core::Contact;

use super::tags::Tags;

/// Alternate keys for a contact field, in lookup priority order.
fn alternates(field: &str) -> [String; 5] {
    [
        field.to_string(),
        format!("contact:{field}"),
        format!("{field}:main"),
        format!("operator:{field}"),
        format!("brand:{field}"),
    ]
}

pub(crate) fn resolve_contact(tags: &Tags<'_>) -> Contact {
    Contact {
        phones: resolve_phones(tags),
        email: tags.first_of(&alternates("email")).map(str::to_string),
        website: tags.first_of(&alternates("website")).map(str::to_string),
    }
}

/// Union of every phone alternate, split on `;`, first-seen order.
fn resolve_phones(tags: &Tags<'_>) -> Vec<String> {
    let mut phones: Vec<String> = Vec::new();
    for key in alternates("phone") {
        let Some(value) = tags.get(&key) else {
            continue;
        };
        for phone in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if !phones.iter().any(|known| known == phone) {
                phones.push(phone.to_string());
            }
        }
    }
    phones
}

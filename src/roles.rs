/// Map a raw credit label to its canonical plural form.
///
/// The three checks run one after another on the current value, so a label is
/// tested against every keyword even after an earlier rewrite.
pub fn normalize_role(label: &str) -> String {
    let mut role = label.to_string();
    if role.contains("Director") {
        role = "Directors".to_string();
    }
    if role.contains("Writer") {
        role = "Writers".to_string();
    }
    if role.contains("Star") {
        role = "Stars".to_string();
    }
    role
}

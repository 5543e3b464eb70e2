//! Cosmetic display-name generation. The exact output is not part of the
//! protocol contract; clients only ever echo it back verbatim.

use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Brave", "Clever", "Happy", "Kind", "Quick", "Witty", "Lucky", "Joyful", "Proud", "Bright",
];

const ANIMALS: &[&str] = &[
    "Lion", "Elephant", "Eagle", "Tiger", "Fox", "Dolphin", "Penguin", "Koala", "Panda", "Giraffe",
];

/// Generate a display name like "Brave Fox 01HQ", suffixed with the first
/// four characters of the connection id so names stay distinguishable even
/// when the random words collide.
pub fn generate_username(connection_id: &str) -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let animal = ANIMALS[rng.random_range(0..ANIMALS.len())];
    let suffix: String = connection_id.chars().take(4).collect();
    format!("{} {} {}", adjective, animal, suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_shape() {
        let name = generate_username("abcd1234");
        let parts: Vec<&str> = name.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(ADJECTIVES.contains(&parts[0]));
        assert!(ANIMALS.contains(&parts[1]));
        assert_eq!(parts[2], "ABCD");
    }

    #[test]
    fn test_short_connection_id() {
        let name = generate_username("xy");
        assert!(name.ends_with("XY"));
    }
}

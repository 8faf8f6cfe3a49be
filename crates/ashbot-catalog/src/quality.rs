//! Genre and series-name normalization.

use ashbot_core::similarity::sequence_ratio;

/// Fixed genre taxonomy: lowercase key → canonical display form.
const STANDARD_GENRES: &[(&str, &str)] = &[
    ("action", "Action"),
    ("rpg", "RPG"),
    ("strategy", "Strategy"),
    ("puzzle", "Puzzle"),
    ("horror", "Horror"),
    ("survival", "Survival"),
    ("platformer", "Platformer"),
    ("racing", "Racing"),
    ("sports", "Sports"),
    ("simulation", "Simulation"),
    ("adventure", "Adventure"),
    ("shooter", "Shooter"),
    ("action-rpg", "Action-RPG"),
    ("action-adventure", "Action-Adventure"),
    ("survival-horror", "Survival-Horror"),
    ("turn-based-strategy", "Turn-Based Strategy"),
    ("first-person-shooter", "FPS"),
    ("third-person-shooter", "TPS"),
    ("roguelike", "Roguelike"),
    ("roguelite", "Roguelite"),
    ("metroidvania", "Metroidvania"),
    ("souls-like", "Souls-Like"),
    ("battle-royale", "Battle Royale"),
];

/// Aliases folded into the taxonomy.
const GENRE_ALIASES: &[(&str, &str)] = &[
    ("fps", "FPS"),
    ("tps", "TPS"),
    ("action rpg", "Action-RPG"),
    ("actionrpg", "Action-RPG"),
    ("arpg", "Action-RPG"),
    ("jrpg", "RPG"),
    ("western rpg", "RPG"),
    ("crpg", "RPG"),
    ("hack and slash", "Action"),
    ("hack-and-slash", "Action"),
    ("beat em up", "Action"),
    ("beat-em-up", "Action"),
    ("fighting", "Action"),
    ("stealth", "Action"),
    ("mmo", "RPG"),
    ("mmorpg", "RPG"),
    ("sandbox", "Adventure"),
    ("open world", "Adventure"),
    ("open-world", "Adventure"),
];

/// Canonical series names for common shorthands and misspellings.
const SERIES_MAPPINGS: &[(&str, &str)] = &[
    ("halo", "Halo"),
    ("the last of us", "The Last of Us"),
    ("tlou", "The Last of Us"),
    ("god of war", "God of War"),
    ("gow", "God of War"),
    ("grand theft auto", "Grand Theft Auto"),
    ("gta", "Grand Theft Auto"),
    ("cod", "Call of Duty"),
    ("call of duty", "Call of Duty"),
    ("red dead redemption", "Red Dead Redemption"),
    ("rdr", "Red Dead Redemption"),
    ("dark souls", "Dark Souls"),
    ("elder scrolls", "The Elder Scrolls"),
    ("the elder scrolls", "The Elder Scrolls"),
    ("fallout", "Fallout"),
    ("witcher", "The Witcher"),
    ("the witcher", "The Witcher"),
    ("zelda", "The Legend of Zelda"),
    ("legend of zelda", "The Legend of Zelda"),
    ("the legend of zelda", "The Legend of Zelda"),
    ("loz", "The Legend of Zelda"),
    ("final fantasy", "Final Fantasy"),
    ("ff", "Final Fantasy"),
    ("metal gear", "Metal Gear"),
    ("metal gear solid", "Metal Gear Solid"),
    ("mgs", "Metal Gear Solid"),
    ("resident evil", "Resident Evil"),
    ("re", "Resident Evil"),
    ("silent hill", "Silent Hill"),
    ("assassins creed", "Assassin's Creed"),
    ("assassin's creed", "Assassin's Creed"),
    ("ac", "Assassin's Creed"),
    ("tomb raider", "Tomb Raider"),
    ("uncharted", "Uncharted"),
    ("mass effect", "Mass Effect"),
    ("dragon age", "Dragon Age"),
    ("bioshock", "BioShock"),
    ("borderlands", "Borderlands"),
    ("gears of war", "Gears of War"),
    ("dead space", "Dead Space"),
    ("doom", "DOOM"),
    ("wolfenstein", "Wolfenstein"),
    ("dishonored", "Dishonored"),
    ("prey", "Prey"),
    ("deus ex", "Deus Ex"),
    ("half life", "Half-Life"),
    ("half-life", "Half-Life"),
    ("portal", "Portal"),
    ("left 4 dead", "Left 4 Dead"),
    ("l4d", "Left 4 Dead"),
];

/// Normalize a genre to the taxonomy: direct key, alias, fuzzy match at
/// 0.8, else title-case passthrough.
pub fn normalize_genre(input: &str) -> Option<String> {
    let clean = input.trim().to_lowercase();
    if clean.is_empty() {
        return None;
    }

    if let Some((_, v)) = STANDARD_GENRES.iter().find(|(k, _)| *k == clean) {
        return Some(v.to_string());
    }
    if let Some((_, v)) = GENRE_ALIASES.iter().find(|(k, _)| *k == clean) {
        return Some(v.to_string());
    }

    let all_keys = STANDARD_GENRES.iter().chain(GENRE_ALIASES.iter());
    if let Some((_, v)) = all_keys
        .map(|(k, v)| (sequence_ratio(&clean, k), v))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
    {
        return Some(v.to_string());
    }

    Some(title_case(input.trim()))
}

/// Normalize a series name: direct mapping, fuzzy match at 0.85, else
/// title-case passthrough.
pub fn normalize_series(input: &str) -> Option<String> {
    let clean = input.trim().to_lowercase();
    if clean.is_empty() {
        return None;
    }

    if let Some((_, v)) = SERIES_MAPPINGS.iter().find(|(k, _)| *k == clean) {
        return Some(v.to_string());
    }

    if let Some((_, v)) = SERIES_MAPPINGS
        .iter()
        .map(|(k, v)| (sequence_ratio(&clean, k), v))
        .filter(|(score, _)| *score >= 0.85)
        .max_by(|a, b| a.0.total_cmp(&b.0))
    {
        return Some(v.to_string());
    }

    Some(title_case(input.trim()))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_and_alias_genres() {
        assert_eq!(normalize_genre("rpg").as_deref(), Some("RPG"));
        assert_eq!(normalize_genre("ARPG").as_deref(), Some("Action-RPG"));
        assert_eq!(normalize_genre("mmorpg").as_deref(), Some("RPG"));
    }

    #[test]
    fn fuzzy_genre_catches_typos() {
        assert_eq!(normalize_genre("survival-horor").as_deref(), Some("Survival-Horror"));
    }

    #[test]
    fn unknown_genre_title_cases() {
        assert_eq!(normalize_genre("visual novel").as_deref(), Some("Visual Novel"));
        assert_eq!(normalize_genre("   "), None);
    }

    #[test]
    fn series_shorthands_expand() {
        assert_eq!(normalize_series("gta").as_deref(), Some("Grand Theft Auto"));
        assert_eq!(normalize_series("TLOU").as_deref(), Some("The Last of Us"));
        assert_eq!(normalize_series("the witcher").as_deref(), Some("The Witcher"));
    }

    #[test]
    fn short_abbreviations_are_direct_lookups() {
        // Two-letter shorthands are far below the fuzzy threshold; only the
        // table can expand them.
        assert_eq!(normalize_series("ff").as_deref(), Some("Final Fantasy"));
        assert_eq!(normalize_series("re").as_deref(), Some("Resident Evil"));
        assert_eq!(normalize_series("ac").as_deref(), Some("Assassin's Creed"));
        assert_eq!(normalize_series("loz").as_deref(), Some("The Legend of Zelda"));
        assert_eq!(normalize_series("prey").as_deref(), Some("Prey"));
    }

    #[test]
    fn series_fuzzy_catches_near_misses() {
        assert_eq!(normalize_series("dark soulss").as_deref(), Some("Dark Souls"));
    }

    #[test]
    fn unknown_series_title_cases() {
        assert_eq!(normalize_series("pikmin").as_deref(), Some("Pikmin"));
    }
}

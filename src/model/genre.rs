use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_CHARACTER_NAME: &str = "Alex";
pub const DEFAULT_ROLE: &str = "Adventurer";

/// A selectable setting and the roles a player may take in it.
#[derive(Debug, Clone, Copy)]
pub struct Genre {
    pub id: &'static str,
    pub name: &'static str,
    pub roles: &'static [&'static str],
}

pub const RANDOM_GENRE_ID: &str = "5";

pub const GENRES: &[Genre] = &[
    Genre {
        id: "1",
        name: "Fantasy",
        roles: &[
            "Noble", "Peasant", "Mage", "Knight", "Ranger", "Alchemist", "Thief", "Bard",
            "Cleric", "Druid", "Assassin", "Paladin", "Warlock", "Monk", "Sorcerer",
            "Beastmaster", "Enchanter", "Blacksmith", "Merchant", "Gladiator", "Wizard",
        ],
    },
    Genre {
        id: "2",
        name: "Sci-Fi",
        roles: &[
            "Space Marine", "Scientist", "Android", "Pilot", "Engineer", "Alien Diplomat",
            "Space Pirate", "Navigator", "Medic", "Robot Technician", "Cybernetic Soldier",
            "Explorer", "Astrobiologist", "Quantum Hacker", "Starship Captain",
            "Galactic Trader", "AI Specialist", "Terraformer", "Cyberneticist", "Bounty Hunter",
        ],
    },
    Genre {
        id: "3",
        name: "Cyberpunk",
        roles: &[
            "Hacker", "Street Samurai", "Corporate Agent", "Techie", "Rebel Leader",
            "Drone Operator", "Synth Dealer", "Information Courier", "Augmentation Engineer",
            "Black Market Dealer", "Scumbag", "Police", "Cyborg",
        ],
    },
    Genre {
        id: "4",
        name: "Post-Apocalyptic",
        roles: &[
            "Survivor", "Scavenger", "Mutant", "Trader", "Raider", "Medic",
            "Cult Leader", "Berserker", "Soldier",
        ],
    },
    Genre {
        id: RANDOM_GENRE_ID,
        name: "Random",
        roles: &[],
    },
];

pub fn find_genre(id: &str) -> Option<&'static Genre> {
    GENRES.iter().find(|g| g.id == id)
}

pub fn roles_for(id: &str) -> &'static [&'static str] {
    find_genre(id).map(|g| g.roles).unwrap_or(&[])
}

/// A genre and role after "Random" and invalid choices are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetup {
    pub genre: String,
    pub role: String,
    pub character_name: String,
}

/// Resolves the player's setup choices. Returns `None` for an unknown genre id.
pub fn resolve_setup<R: Rng + ?Sized>(
    genre_id: &str,
    role: Option<&str>,
    character_name: &str,
    rng: &mut R,
) -> Option<ResolvedSetup> {
    let mut genre = find_genre(genre_id)?;

    if genre.id == RANDOM_GENRE_ID {
        let playable: Vec<&Genre> = GENRES.iter().filter(|g| g.id != RANDOM_GENRE_ID).collect();
        genre = playable.choose(rng).copied()?;
    }

    let role = match role.map(str::trim) {
        Some(r) if genre.roles.contains(&r) => r.to_string(),
        other => {
            let picked = genre
                .roles
                .choose(rng)
                .copied()
                .unwrap_or(DEFAULT_ROLE)
                .to_string();
            tracing::info!(requested = ?other, picked = %picked, "invalid role, using random role");
            picked
        }
    };

    let character_name = match character_name.trim() {
        "" => DEFAULT_CHARACTER_NAME.to_string(),
        name => name.to_string(),
    };

    Some(ResolvedSetup {
        genre: genre.name.to_string(),
        role,
        character_name,
    })
}

/// Opening clause for the first scene, completed by the narrator.
pub fn role_starter(genre: &str, role: &str) -> &'static str {
    let specific = match (genre, role) {
        ("Fantasy", "Peasant") => Some("You're toiling in the fields of a small village when"),
        ("Fantasy", "Noble") => Some("You're overseeing your estate's affairs when"),
        ("Fantasy", "Mage") => Some("You're studying ancient tomes in your tower when"),
        ("Fantasy", "Knight") => Some("You're training in the castle courtyard when"),
        ("Fantasy", "Ranger") => Some("You're tracking game in the deep forest when"),
        ("Fantasy", "Thief") => Some("You're casing a noble's manor in the city when"),
        ("Fantasy", "Bard") => Some("You're performing in a crowded tavern when"),
        ("Fantasy", "Cleric") => Some("You're tending to the sick in the temple when"),
        ("Fantasy", "Assassin") => Some("You're preparing for a contract in the shadows when"),
        ("Fantasy", "Paladin") => Some("You're praying at the altar of your deity when"),
        ("Sci-Fi", "Space Marine") => {
            Some("You're conducting patrol on a derelict space station when")
        }
        ("Sci-Fi", "Scientist") => Some("You're analyzing alien samples in your lab when"),
        ("Sci-Fi", "Android") => Some("You're performing system diagnostics on your ship when"),
        ("Sci-Fi", "Pilot") => Some("You're navigating through an asteroid field when"),
        ("Sci-Fi", "Engineer") => Some("You're repairing the FTL drive when"),
        ("Sci-Fi", "Alien Diplomat") => {
            Some("You're negotiating with an alien delegation when")
        }
        ("Sci-Fi", "Bounty Hunter") => Some("You're tracking a target through a spaceport when"),
        ("Sci-Fi", "Starship Captain") => {
            Some("You're commanding the bridge during warp travel when")
        }
        ("Cyberpunk", "Hacker") => Some("You're infiltrating a corporate network when"),
        ("Cyberpunk", "Street Samurai") => Some("You're patrolling the neon-lit streets when"),
        ("Cyberpunk", "Corporate Agent") => {
            Some("You're closing a deal in a high-rise office when")
        }
        ("Cyberpunk", "Techie") => Some("You're modifying cyberware in your workshop when"),
        ("Cyberpunk", "Rebel Leader") => {
            Some("You're planning a raid on a corporate facility when")
        }
        ("Cyberpunk", "Cyborg") => Some("You're calibrating your cybernetic enhancements when"),
        ("Post-Apocalyptic", "Survivor") => {
            Some("You're scavenging in the ruins of an old city when")
        }
        ("Post-Apocalyptic", "Scavenger") => Some("You're searching a pre-collapse bunker when"),
        ("Post-Apocalyptic", "Raider") => Some("You're ambushing a convoy in the wasteland when"),
        ("Post-Apocalyptic", "Medic") => {
            Some("You're treating radiation sickness in your clinic when")
        }
        ("Post-Apocalyptic", "Cult Leader") => {
            Some("You're preaching to your followers at a ritual when")
        }
        _ => None,
    };

    specific.unwrap_or(match genre {
        "Fantasy" => "You're going about your daily duties when",
        "Sci-Fi" => "You're performing routine tasks aboard your vessel when",
        "Cyberpunk" => "You're navigating the neon-lit streets when",
        "Post-Apocalyptic" => "You're surviving in the wasteland when",
        _ => "You find yourself in an unexpected situation when",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn valid_role_is_kept() {
        let mut rng = StdRng::seed_from_u64(1);
        let setup = resolve_setup("1", Some("Bard"), "  Wren ", &mut rng).unwrap();
        assert_eq!(setup.genre, "Fantasy");
        assert_eq!(setup.role, "Bard");
        assert_eq!(setup.character_name, "Wren");
    }

    #[test]
    fn invalid_role_falls_back_to_genre_role() {
        let mut rng = StdRng::seed_from_u64(7);
        let setup = resolve_setup("3", Some("Wizard"), "", &mut rng).unwrap();
        assert_eq!(setup.genre, "Cyberpunk");
        assert!(roles_for("3").contains(&setup.role.as_str()));
        assert_eq!(setup.character_name, DEFAULT_CHARACTER_NAME);
    }

    #[test]
    fn random_genre_resolves_to_playable_genre() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let setup = resolve_setup(RANDOM_GENRE_ID, None, "Kai", &mut rng).unwrap();
            assert_ne!(setup.genre, "Random");
            assert!(!setup.role.is_empty());
        }
    }

    #[test]
    fn unknown_genre_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(resolve_setup("9", None, "Kai", &mut rng).is_none());
    }

    #[test]
    fn starters_fall_back_by_genre_then_globally() {
        assert_eq!(
            role_starter("Fantasy", "Mage"),
            "You're studying ancient tomes in your tower when"
        );
        assert_eq!(
            role_starter("Fantasy", "Druid"),
            "You're going about your daily duties when"
        );
        assert_eq!(
            role_starter("Western", "Sheriff"),
            "You find yourself in an unexpected situation when"
        );
    }
}

use crate::models::{DietaryPrefs, UserPreferences, normalize_list};

/// Merge request-supplied preferences over stored ones, field by field.
///
/// A request field wins whenever it has at least one non-blank entry.
pub fn resolve_preferences(
    request: Option<&UserPreferences>,
    stored: Option<&DietaryPrefs>,
) -> UserPreferences {
    let pick = |requested: Option<&Vec<String>>, saved: Option<&Vec<String>>| {
        let requested = requested.map(|v| normalize_list(v)).unwrap_or_default();
        if requested.is_empty() {
            saved.map(|v| normalize_list(v)).unwrap_or_default()
        } else {
            requested
        }
    };

    UserPreferences {
        restrictions: pick(
            request.map(|r| &r.restrictions),
            stored.map(|s| &s.restrictions),
        ),
        allergies: pick(request.map(|r| &r.allergies), stored.map(|s| &s.allergies)),
        tools: pick(request.map(|r| &r.tools), stored.map(|s| &s.tools)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn stored() -> DietaryPrefs {
        DietaryPrefs {
            user_id: 1,
            restrictions: strings(&["vegan"]),
            allergies: strings(&["peanuts"]),
            tools: strings(&["oven"]),
        }
    }

    #[test]
    fn test_nothing_anywhere() {
        assert_eq!(resolve_preferences(None, None), UserPreferences::default());
    }

    #[test]
    fn test_stored_used_without_request() {
        let resolved = resolve_preferences(None, Some(&stored()));
        assert_eq!(resolved, stored().as_preferences());
    }

    #[test]
    fn test_request_wins_per_field() {
        let request = UserPreferences {
            restrictions: strings(&["vegetarian"]),
            allergies: vec![],
            tools: strings(&["  "]),
        };
        let resolved = resolve_preferences(Some(&request), Some(&stored()));
        assert_eq!(resolved.restrictions, strings(&["vegetarian"]));
        assert_eq!(resolved.allergies, strings(&["peanuts"]));
        assert_eq!(resolved.tools, strings(&["oven"]));
    }

    #[test]
    fn test_request_without_stored() {
        let request = UserPreferences {
            restrictions: strings(&["Vegan", "vegan"]),
            ..UserPreferences::default()
        };
        let resolved = resolve_preferences(Some(&request), None);
        assert_eq!(resolved.restrictions, strings(&["Vegan"]));
        assert!(resolved.tools.is_empty());
    }
}

//! Prompt templates used by the capability agents and the planner.
//! Templates use `{{variable}}` placeholders.

use std::collections::HashMap;

/// A template for generating model prompts
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template content with {{variable}} placeholders
    template: &'static str,
    /// Default variables
    defaults: HashMap<String, String>,
}

impl PromptTemplate {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            defaults: HashMap::new(),
        }
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Renders the template with the given variables, falling back to the
    /// defaults. Substitution is a single pass over the template, so values
    /// are never rescanned. Unknown placeholders are left as they are.
    pub fn render(&self, variables: &HashMap<&str, String>) -> String {
        let mut result = String::with_capacity(self.template.len());
        let mut rest = self.template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                rest = &rest[open..];
                break;
            };
            let key = &after[..close];
            match variables.get(key).or_else(|| self.defaults.get(key)) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[open..open + close + 4]),
            }
            rest = &after[close + 2..];
        }
        result.push_str(rest);

        result
    }
}

/// Asks for hotel search parameters as a JSON object.
pub const HOTEL_EXTRACTION: &str = r#"Analyze this hotel booking request: "{{request}}"

Extract the following information:
1. Location (city/country)
2. Check-in date (YYYY-MM-DD format)
3. Check-out date (YYYY-MM-DD format)
4. Number of guests
5. Budget preference (budget/mid-range/luxury/any)

Today is {{today}}.
Return only a JSON object with the keys "location", "check_in", "check_out", "guests" and "budget".
If any information is missing, use reasonable defaults."#;

/// Asks for car rental search parameters as a JSON object.
pub const CAR_EXTRACTION: &str = r#"Analyze this car rental request: "{{request}}"

Extract the following information:
1. Location (city/country)
2. Start date (YYYY-MM-DD format)
3. End date (YYYY-MM-DD format)
4. Budget preference (budget/mid-range/luxury/any)
5. Driver age (if mentioned)

Today is {{today}}.
Return only a JSON object with the keys "location", "start_date", "end_date", "budget" and "driver_age".
If any information is missing, use reasonable defaults."#;

/// Final itinerary prompt built from the trip request and peer results.
pub const TRIP_NARRATIVE: &str = r#"Create a comprehensive travel plan for a trip to {{destination}}.

Trip details:
- Destination: {{destination}}
- Check-in: {{check_in}}
- Check-out: {{check_out}}
- Budget: {{budget}}
- Guests: {{guests}}
- Nights: {{nights}}
- Car rental needed: {{car_needed}}
- Preferences: {{preferences}}

Hotel recommendations:
{{hotels}}

Car rental options:
{{cars}}

Write a travel plan with:
1. A short trip summary
2. The top hotel recommendations with prices
3. Car rental options (if requested)
4. An estimated cost breakdown
5. Practical travel tips for the destination
6. A day-by-day itinerary"#;

/// Sent back to the Front Door when no narrative could be generated.
pub const NARRATIVE_PLACEHOLDER: &str = "We're sorry, a written itinerary could not be generated \
for this trip right now. The hotel and car rental results gathered so far are included below.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rendering() {
        let template = PromptTemplate::new("Hello {{name}}, welcome to {{place}}!")
            .with_default("place", "Lisbon");

        let mut variables = HashMap::new();
        variables.insert("name", "Alice".to_string());

        assert_eq!(template.render(&variables), "Hello Alice, welcome to Lisbon!");

        variables.insert("place", "Porto".to_string());
        assert_eq!(template.render(&variables), "Hello Alice, welcome to Porto!");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = PromptTemplate::new(CAR_EXTRACTION);
        let mut variables = HashMap::new();
        variables.insert("request", "a car from {{today}} until {{later}}".to_string());
        variables.insert("today", "2025-11-11".to_string());

        let prompt = template.render(&variables);
        assert!(prompt.contains("\"a car from {{today}} until {{later}}\""));
        assert!(prompt.contains("Today is 2025-11-11."));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let template = PromptTemplate::new("{{a}} then {{b");
        let mut variables = HashMap::new();
        variables.insert("a", "x".to_string());
        assert_eq!(template.render(&variables), "x then {{b");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let template = PromptTemplate::new("{{known}} and {{unknown}}");
        let mut variables = HashMap::new();
        variables.insert("known", "x".to_string());
        assert_eq!(template.render(&variables), "x and {{unknown}}");
    }
}

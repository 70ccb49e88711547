use std::fmt::Write as _;

use wayfarer_llm::Message;
use wayfarer_retrieval::{GraphFact, VectorMatch};

/// Vector matches rendered into the prompt.
pub const VECTOR_PROMPT_LIMIT: usize = 5;
/// Graph facts rendered into the prompt.
pub const GRAPH_PROMPT_LIMIT: usize = 8;

const GRAPH_TAG_LIMIT: usize = 3;
const GRAPH_NEARBY_LIMIT: usize = 2;

const SYSTEM_TEMPLATE: &str = "\
You are {name}, an expert travel assistant specializing in {domain} tourism.\n\
\n\
Use the provided context from travel databases to create personalized, practical \
itineraries and recommendations.\n\
\n\
RESPONSE GUIDELINES:\n\
1. Create detailed day-by-day itineraries when asked\n\
2. Include specific cities, attractions, and practical tips\n\
3. Consider best times to visit, regions, and travel connections\n\
4. Suggest logical sequences and connections between locations\n\
5. Be engaging but concise - focus on actionable advice\n\
6. When referencing specific places, mention their names and key features\n\
7. Provide 2-3 concrete itinerary steps or tips based on the context\n\
\n\
Always base recommendations on the provided context data from the travel database.";

/// Everything the completion call needs for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub system: String,
    pub query: String,
    pub vector_block: String,
    pub graph_block: String,
    domain: String,
}

impl PromptContext {
    /// User turn: the verbatim query followed by both context blocks.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!(
            "User query: {}\n\n\
             Top travel destinations from database:\n{}\n\n\
             Location connections and context:\n{}\n\n\
             Based on the above {} travel data, provide a helpful response. \
             Include specific cities, attractions, and practical travel advice.",
            self.query, self.vector_block, self.graph_block, self.domain
        )
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system.clone()),
            Message::user(self.user_message()),
        ]
    }
}

/// Renders retrieval results into a [`PromptContext`] for a fixed assistant persona.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system: String,
    domain: String,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new("VietnamTravel AI", "Vietnam")
    }
}

impl ContextBuilder {
    #[must_use]
    pub fn new(assistant_name: &str, domain: &str) -> Self {
        Self {
            system: SYSTEM_TEMPLATE
                .replace("{name}", assistant_name)
                .replace("{domain}", domain),
            domain: domain.to_owned(),
        }
    }

    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    #[must_use]
    pub fn build(&self, query: &str, matches: &[VectorMatch], facts: &[GraphFact]) -> PromptContext {
        PromptContext {
            system: self.system.clone(),
            query: query.to_owned(),
            vector_block: render_vector_block(matches),
            graph_block: render_graph_block(facts),
            domain: self.domain.clone(),
        }
    }
}

/// One numbered line per match, first [`VECTOR_PROMPT_LIMIT`] only. Empty input renders `""`.
#[must_use]
pub fn render_vector_block(matches: &[VectorMatch]) -> String {
    matches
        .iter()
        .take(VECTOR_PROMPT_LIMIT)
        .enumerate()
        .map(|(i, m)| vector_line(i + 1, m))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One bulleted line per fact, first [`GRAPH_PROMPT_LIMIT`] only. Empty input renders `""`.
#[must_use]
pub fn render_graph_block(facts: &[GraphFact]) -> String {
    facts
        .iter()
        .take(GRAPH_PROMPT_LIMIT)
        .map(graph_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn vector_line(rank: usize, m: &VectorMatch) -> String {
    let meta = &m.metadata;
    let description = meta
        .description
        .as_deref()
        .or(meta.semantic_text.as_deref())
        .unwrap_or_default();

    let mut line = format!(
        "{rank}. {} (Type: {}, Region: {}) - {description}",
        meta.name, meta.kind, meta.region
    );
    if !meta.tags.is_empty() {
        let _ = write!(line, " Tags: {}.", meta.tags.join(", "));
    }
    let _ = write!(
        line,
        " Best time: {}. Relevance score: {:.3}",
        meta.best_time_to_visit, m.score
    );
    line
}

fn graph_line(fact: &GraphFact) -> String {
    let mut line = format!(
        "• {} ({}) in {}: {}",
        fact.name, fact.kind, fact.region, fact.description
    );
    if !fact.tags.is_empty() {
        let tags: Vec<&str> = fact.tags.iter().take(GRAPH_TAG_LIMIT).map(String::as_str).collect();
        let _ = write!(line, " Features: {}.", tags.join(", "));
    }
    if !fact.nearby_locations.is_empty() {
        let nearby: Vec<&str> = fact
            .nearby_locations
            .iter()
            .take(GRAPH_NEARBY_LIMIT)
            .map(String::as_str)
            .collect();
        let _ = write!(line, " Nearby destinations: {}.", nearby.join(", "));
    }
    line
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use wayfarer_llm::Role;
    use wayfarer_retrieval::VectorMetadata;

    use super::*;

    fn vector_match(name: &str, score: f32) -> VectorMatch {
        VectorMatch {
            id: name.to_lowercase(),
            score,
            metadata: VectorMetadata {
                name: name.into(),
                region: "Northern Vietnam".into(),
                kind: "City".into(),
                description: Some("Capital city".into()),
                semantic_text: None,
                tags: vec!["culture".into(), "food".into()],
                best_time_to_visit: "Oct-Dec".into(),
            },
        }
    }

    fn fact(name: &str) -> GraphFact {
        GraphFact {
            node_id: name.to_lowercase(),
            name: name.into(),
            kind: "City".into(),
            region: "Central Vietnam".into(),
            description: "Former imperial capital on the river".into(),
            best_time: "Jan-Apr".into(),
            tags: vec!["heritage".into(), "food".into(), "river".into(), "citadel".into()],
            nearby_locations: vec!["Da Nang".into(), "Hoi An".into(), "Phong Nha".into()],
        }
    }

    #[test]
    fn vector_line_format() {
        let block = render_vector_block(&[vector_match("Hanoi", 0.87654)]);
        assert_eq!(
            block,
            "1. Hanoi (Type: City, Region: Northern Vietnam) - Capital city \
             Tags: culture, food. Best time: Oct-Dec. Relevance score: 0.877"
        );
    }

    #[test]
    fn vector_description_falls_back_to_semantic_text() {
        let mut m = vector_match("Sapa", 0.5);
        m.metadata.description = None;
        m.metadata.semantic_text = Some("Terraced rice fields".into());
        m.metadata.tags.clear();
        let block = render_vector_block(&[m]);
        assert!(block.contains(" - Terraced rice fields Best time: Oct-Dec."));
        assert!(!block.contains("Tags:"));
    }

    #[test]
    fn graph_line_caps_tags_and_nearby() {
        let block = render_graph_block(&[fact("Hue")]);
        assert_eq!(
            block,
            "• Hue (City) in Central Vietnam: Former imperial capital on the river \
             Features: heritage, food, river. Nearby destinations: Da Nang, Hoi An."
        );
    }

    #[test]
    fn empty_inputs_render_empty_blocks() {
        assert_eq!(render_vector_block(&[]), "");
        assert_eq!(render_graph_block(&[]), "");
    }

    #[test]
    fn vector_block_caps_at_five() {
        let matches: Vec<_> = (0..20).map(|i| vector_match(&format!("Place {i}"), 0.5)).collect();
        let block = render_vector_block(&matches);
        assert_eq!(block.lines().count(), VECTOR_PROMPT_LIMIT);
        assert!(block.lines().last().unwrap().starts_with("5. Place 4 "));
    }

    #[test]
    fn graph_block_caps_at_eight() {
        let facts: Vec<_> = (0..15).map(|i| fact(&format!("Town {i}"))).collect();
        let block = render_graph_block(&facts);
        assert_eq!(block.lines().count(), GRAPH_PROMPT_LIMIT);
        assert!(block.lines().last().unwrap().starts_with("• Town 7 "));
    }

    #[test]
    fn messages_carry_system_and_user_turns() {
        let ctx = ContextBuilder::default().build(
            "Create a romantic 4 day itinerary",
            &[vector_match("Hoi An", 0.9)],
            &[],
        );
        let messages = ctx.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("You are VietnamTravel AI"));
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("User query: Create a romantic 4 day itinerary\n\n"));
        assert!(messages[1].content.contains("1. Hoi An"));
        assert!(messages[1].content.contains("Location connections and context:\n\n\n"));
        assert!(messages[1].content.contains("Based on the above Vietnam travel data"));
    }

    #[test]
    fn persona_is_configurable() {
        let builder = ContextBuilder::new("KyotoGuide", "Japan");
        assert!(builder.system_prompt().starts_with("You are KyotoGuide, an expert"));
        assert!(builder.system_prompt().contains("specializing in Japan tourism"));
        let ctx = builder.build("temples", &[], &[]);
        assert!(ctx.user_message().contains("Based on the above Japan travel data"));
    }

    proptest! {
        #[test]
        fn build_is_deterministic(
            query in ".{0,60}",
            names in proptest::collection::vec("[A-Za-z ]{1,12}", 0..12),
            score in 0.0f32..1.0,
        ) {
            let matches: Vec<_> = names.iter().map(|n| vector_match(n, score)).collect();
            let facts: Vec<_> = names.iter().map(|n| fact(n)).collect();
            let builder = ContextBuilder::default();
            let a = builder.build(&query, &matches, &facts);
            let b = builder.build(&query, &matches, &facts);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.vector_block.lines().count() <= VECTOR_PROMPT_LIMIT);
            prop_assert!(a.graph_block.lines().count() <= GRAPH_PROMPT_LIMIT);
            prop_assert_eq!(a.query, query);
        }
    }
}

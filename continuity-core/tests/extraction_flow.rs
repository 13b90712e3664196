//! End-to-end extraction tests driven by scripted model responses.

use continuity_core::testing::{ScriptedCompletion, StalledCompletion, StaticSpans};
use continuity_core::{
    Entity, EntityType, ExtractionConfig, ExtractionPipeline, RawSpan,
};
use std::sync::Arc;

fn span_at(text: &str, surface: &str, label: &str, confidence: f64) -> RawSpan {
    let start = text.find(surface).expect("surface present");
    RawSpan::model(start, start + surface.len(), surface, label, confidence)
}

fn names(entities: &[Entity]) -> Vec<&str> {
    entities.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn test_mixed_entity_types_resolve() {
    let text = "Dr. Alicia Moreno met with James O'Connor at NeuroPulse Labs in San Diego.";
    let spans = StaticSpans(vec![
        span_at(text, "Alicia Moreno", "PER", 0.99),
        span_at(text, "James O'Connor", "PER", 0.98),
        span_at(text, "NeuroPulse Labs", "ORG", 0.97),
        span_at(text, "San Diego", "LOC", 0.99),
    ]);
    let completion = Arc::new(ScriptedCompletion::new(Vec::<String>::new()));
    let pipeline = ExtractionPipeline::new(
        Arc::new(spans),
        completion,
        ExtractionConfig::default().with_llm_facts(false),
    );

    let entities = pipeline.extract_entities(text, "t_001").await;

    assert!(names(&entities).contains(&"Alicia Moreno"));
    assert!(names(&entities).contains(&"James O'Connor"));
    assert!(names(&entities).contains(&"NeuroPulse Labs"));
    assert!(names(&entities).contains(&"San Diego"));

    let labs = entities
        .iter()
        .find(|e| e.name == "NeuroPulse Labs")
        .unwrap();
    assert_eq!(labs.entity_type, EntityType::Organization);
    let diego = entities.iter().find(|e| e.name == "San Diego").unwrap();
    assert_eq!(diego.entity_type, EntityType::Location);
}

#[tokio::test]
async fn test_surname_and_possessive_merge_into_one_entity() {
    let text = "Ludwig van Beethoven arrived. Beethoven's health declined. Beethoven composed on.";
    let spans = StaticSpans(vec![
        span_at(text, "Ludwig van Beethoven", "PER", 0.95),
        RawSpan::model(30, 41, "Beethoven's", "PER", 0.91),
        RawSpan::model(59, 68, "Beethoven", "PER", 0.89),
    ]);
    let completion = Arc::new(ScriptedCompletion::new(Vec::<String>::new()));
    let pipeline = ExtractionPipeline::new(
        Arc::new(spans),
        completion,
        ExtractionConfig::default().with_llm_facts(false),
    );

    let entities = pipeline.extract_entities(text, "t_001").await;
    let people: Vec<&Entity> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Character)
        .collect();

    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name, "Ludwig van Beethoven");
    assert_eq!(people[0].aliases, vec!["Beethoven".to_string()]);
    assert!((people[0].confidence - 0.95).abs() < 1e-9);
    assert!(people[0].version >= 2);
}

#[tokio::test]
async fn test_facts_carry_exact_provenance() {
    let text = "Elena Vasquez tended the old lighthouse. Ships trusted her light.";
    let spans = StaticSpans(vec![span_at(text, "Elena Vasquez", "PER", 0.97)]);
    let completion = Arc::new(ScriptedCompletion::new([
        r#"{"facts": ["Elena Vasquez tended the old lighthouse."]}"#,
    ]));
    let pipeline = ExtractionPipeline::new(
        Arc::new(spans),
        completion,
        ExtractionConfig::default(),
    );

    let entities = pipeline.extract(text, "t_042").await;
    let elena = entities
        .iter()
        .find(|e| e.name == "Elena Vasquez")
        .unwrap();

    assert_eq!(elena.facts.len(), 1);
    let fact = &elena.facts[0];
    assert_eq!(fact.evidence.time_id, "t_042");
    assert_eq!(
        &text[fact.evidence.start..fact.evidence.end],
        fact.source_text
    );
}

#[tokio::test]
async fn test_fact_cap_is_enforced() {
    let text = "Elena sailed. Elena fished. Elena cooked. Elena sang. Elena slept.";
    let response = r#"{"facts": ["Fact one.", "Fact two."]}"#;
    let spans = StaticSpans(vec![span_at(text, "Elena", "PER", 0.97)]);
    let completion = Arc::new(ScriptedCompletion::new(vec![response; 5]));
    let pipeline = ExtractionPipeline::new(
        Arc::new(spans),
        completion,
        ExtractionConfig::default().with_max_facts_per_entity(3),
    );

    let entities = pipeline.extract(text, "t_001").await;
    let elena = entities.iter().find(|e| e.name == "Elena").unwrap();
    assert_eq!(elena.facts.len(), 3);
}

#[tokio::test]
async fn test_stalled_model_degrades_to_entities_without_facts() {
    let text = "Elena Vasquez tended the lighthouse.";
    let spans = StaticSpans(vec![span_at(text, "Elena Vasquez", "PER", 0.97)]);
    let config = ExtractionConfig::default()
        .with_fact_timeout(std::time::Duration::from_millis(50));
    let pipeline =
        ExtractionPipeline::new(Arc::new(spans), Arc::new(StalledCompletion), config);

    let entities = pipeline.extract(text, "t_001").await;

    // Entities survive; every fact list is empty.
    assert!(!entities.is_empty());
    assert!(entities.iter().all(|e| e.facts.is_empty()));
}

#[tokio::test]
async fn test_serialized_output_shape() {
    let text = "Elena Vasquez tended the lighthouse.";
    let spans = StaticSpans(vec![span_at(text, "Elena Vasquez", "PER", 0.97)]);
    let completion = Arc::new(ScriptedCompletion::new([
        r#"{"facts": ["Elena Vasquez tended the lighthouse."]}"#,
    ]));
    let pipeline = ExtractionPipeline::new(
        Arc::new(spans),
        completion,
        ExtractionConfig::default(),
    );

    let entities = pipeline.extract(text, "t_001").await;
    let json = serde_json::to_value(&entities).unwrap();

    let elena = json
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == "Elena Vasquez")
        .unwrap();
    assert_eq!(elena["entityType"], "character");
    assert_eq!(elena["firstMentionedAt"], "t_001");
    assert_eq!(elena["facts"][0]["method"], "llm");
    assert_eq!(elena["facts"][0]["evidence"]["timeId"], "t_001");
}

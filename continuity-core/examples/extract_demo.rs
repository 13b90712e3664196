//! Offline extraction demo: heuristic candidates plus pattern rules, no
//! model server required.
//!
//! Run with: `cargo run -p continuity-core --example extract_demo`

use continuity_core::testing::ScriptedCompletion;
use continuity_core::{
    ExtractionConfig, ExtractionPipeline, HeuristicSpanExtractor,
};
use std::sync::Arc;

const STORY: &str = "Elena Vasquez, a retired cartographer, tended the lighthouse at Harbor Point. \
    Every night Elena said a quiet word to the sea. \
    Sailors still spoke of the Battle of Aldora, and of Elena's weathered map.";

#[tokio::main]
async fn main() {
    // No completion server in this demo: fact extraction runs on the rule
    // library alone.
    let config = ExtractionConfig::default()
        .with_llm_facts(false)
        .with_rules_fallback(true);
    let completion = Arc::new(ScriptedCompletion::new(Vec::<String>::new()));
    let pipeline = ExtractionPipeline::new(
        Arc::new(HeuristicSpanExtractor::default()),
        completion,
        config,
    );

    let entities = pipeline.extract(STORY, "t_001").await;

    println!("=== Extracted {} entities ===\n", entities.len());
    for entity in &entities {
        println!(
            "{} [{}] {:.2} {}",
            entity.id,
            entity.entity_type.name(),
            entity.confidence,
            entity.name
        );
        for alias in &entity.aliases {
            println!("    alias: {alias}");
        }
        for fact in &entity.facts {
            println!(
                "    fact ({:?}, {:.2}): {}",
                fact.method, fact.confidence, fact.fact
            );
        }
    }

    println!(
        "\nFull JSON:\n{}",
        serde_json::to_string_pretty(&entities).unwrap()
    );
}

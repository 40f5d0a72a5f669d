//! Prompt templates for the judging collaborators.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};

const JUDGE_TEMPLATE: &str = include_str!("prompts/judge.md");
const CRITIC_TEMPLATE: &str = include_str!("prompts/critic.md");
const EXPERT_TEMPLATE: &str = include_str!("prompts/expert.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("judge", JUDGE_TEMPLATE)
            .expect("judge template should be valid");
        env.add_template("critic", CRITIC_TEMPLATE)
            .expect("critic template should be valid");
        env.add_template("expert", EXPERT_TEMPLATE)
            .expect("expert template should be valid");
        Self { env }
    }
}

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// User message asking for a qualitative rubric analysis.
pub fn render_judge(text: &str, instructions: &str) -> Result<String> {
    let template = ENGINE.env.get_template("judge")?;
    Ok(template.render(context! { text => text, instructions => instructions.trim() })?)
}

/// User message presenting every candidate, numbered from 1.
pub fn render_critic(outputs: &[String], instructions: &str) -> Result<String> {
    let template = ENGINE.env.get_template("critic")?;
    Ok(template.render(context! { outputs => outputs, instructions => instructions.trim() })?)
}

pub fn render_expert(text: &str, domain: &str) -> Result<String> {
    let template = ENGINE.env.get_template("expert")?;
    Ok(template.render(context! { text => text, domain => domain })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critic_prompt_numbers_outputs() {
        let outputs = vec!["first".to_string(), "second".to_string()];
        let prompt = render_critic(&outputs, "Be fair.").expect("render");
        assert!(prompt.starts_with("Instructions:\nBe fair.\n\nBelow are multiple outputs."));
        assert!(prompt.contains("Output #1:\nfirst\n\nOutput #2:\nsecond\n"));
        assert!(!prompt.contains("Output #3"));
    }

    #[test]
    fn judge_prompt_embeds_text_and_rubric() {
        let prompt = render_judge("my essay", "Check tone.").expect("render");
        assert!(prompt.contains("---\nmy essay\n---"));
        assert!(prompt.contains("Rubric:\nCheck tone."));
    }

    #[test]
    fn expert_prompt_names_domain() {
        let prompt = render_expert("fn main() {}", "software engineering").expect("render");
        assert!(prompt.starts_with("As an expert in software engineering"));
        assert!(prompt.contains("TEXT START\nfn main() {}\nTEXT END"));
    }
}

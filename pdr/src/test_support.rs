//! Scripted collaborators and fixtures for tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::core::types::{ExpertEvaluation, Persona, Rubric, Task};
use crate::io::chat::{ChatClient, ChatRequest, ChatResponse};
use crate::io::critic::Critic;
use crate::io::error::{ChatError, CollaboratorError};
use crate::io::expert::ExpertReviewer;
use crate::io::generator::Generator;
use crate::io::judge::QualitativeJudge;

pub const SCRIPTED_MODEL: &str = "scripted-model";

/// Terminal failure used by the failing doubles.
pub fn terminal_failure(collaborator: &str) -> CollaboratorError {
    CollaboratorError::Exhausted {
        collaborator: collaborator.to_string(),
        attempts: 6,
        source: ChatError::Server { status: 503 },
    }
}

pub fn persona(name: &str) -> Persona {
    Persona {
        name: name.to_string(),
        description: format!("{name} writes plainly."),
    }
}

pub fn rubric(min: usize, max: usize, must_include: &[&str]) -> Rubric {
    Rubric {
        word_count_range: (min, max),
        must_include: must_include.iter().map(|s| s.to_string()).collect(),
        evaluation_instructions: String::new(),
    }
}

/// Task whose rubric only constrains word count and keywords.
pub fn words_task(min: usize, max: usize, must_include: &[&str]) -> Task {
    Task {
        name: "Task".to_string(),
        domain: "general".to_string(),
        target_spec: "Write a few words.".to_string(),
        rubric: rubric(min, max, must_include),
    }
}

/// Chat client that replays a fixed sequence of responses and records requests.
pub struct ScriptedChatClient {
    responses: RefCell<VecDeque<Result<ChatResponse, ChatError>>>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<Result<ChatResponse, ChatError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Successful responses with the given contents and `finish_reason = "stop"`.
    pub fn with_contents<'s>(contents: impl IntoIterator<Item = &'s str>) -> Self {
        Self::new(
            contents
                .into_iter()
                .map(|c| {
                    Ok(ChatResponse {
                        content: c.to_string(),
                        finish_reason: Some("stop".to_string()),
                        reasoning_tokens: 0,
                    })
                })
                .collect(),
        )
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }
}

impl ChatClient for ScriptedChatClient {
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ChatError::InvalidResponse {
                    message: "scripted responses exhausted".to_string(),
                    transient: false,
                })
            })
    }
}

enum Script {
    Queue(RefCell<VecDeque<String>>),
    Repeat(String),
}

/// Generator that returns scripted outputs and records every request.
pub struct ScriptedGenerator {
    script: Script,
    /// Number of successful calls before every call fails.
    fail_after: Option<usize>,
    prompts: RefCell<Vec<String>>,
    temperatures: RefCell<Vec<f32>>,
}

impl ScriptedGenerator {
    /// Outputs returned in order; calls past the end fail terminally.
    pub fn new<'s>(outputs: impl IntoIterator<Item = &'s str>) -> Self {
        let queue = outputs.into_iter().map(str::to_string).collect();
        Self::with_script(Script::Queue(RefCell::new(queue)))
    }

    pub fn repeating(output: &str) -> Self {
        Self::with_script(Script::Repeat(output.to_string()))
    }

    /// Succeeds `successes` times with `output`, then fails terminally.
    pub fn failing_after(successes: usize, output: &str) -> Self {
        let mut generator = Self::repeating(output);
        generator.fail_after = Some(successes);
        generator
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            fail_after: None,
            prompts: RefCell::new(Vec::new()),
            temperatures: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.temperatures.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Generator for ScriptedGenerator {
    fn model(&self) -> &str {
        SCRIPTED_MODEL
    }

    fn generate(
        &self,
        _persona: &Persona,
        instruction: &str,
        temperature: f32,
    ) -> Result<String, CollaboratorError> {
        let call = self.calls();
        self.prompts.borrow_mut().push(instruction.to_string());
        self.temperatures.borrow_mut().push(temperature);
        if self.fail_after.is_some_and(|n| call >= n) {
            return Err(terminal_failure("generator"));
        }
        match &self.script {
            Script::Repeat(output) => Ok(output.clone()),
            Script::Queue(queue) => queue
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| terminal_failure("generator")),
        }
    }
}

/// Judge with a fixed answer, or one that always fails.
pub struct ScriptedJudge {
    answer: Option<String>,
    instructions: RefCell<Vec<String>>,
}

impl ScriptedJudge {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            instructions: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            instructions: RefCell::new(Vec::new()),
        }
    }

    pub fn instructions_seen(&self) -> Vec<String> {
        self.instructions.borrow().clone()
    }
}

impl QualitativeJudge for ScriptedJudge {
    fn judge(&self, _text: &str, instructions: &str) -> Result<String, CollaboratorError> {
        self.instructions.borrow_mut().push(instructions.to_string());
        self.answer
            .clone()
            .ok_or_else(|| terminal_failure("judge"))
    }
}

/// Critic with a fixed report, or one that always fails. Records every batch.
pub struct ScriptedCritic {
    report: Option<String>,
    batches: RefCell<Vec<Vec<String>>>,
}

impl ScriptedCritic {
    pub fn answering(report: &str) -> Self {
        Self {
            report: Some(report.to_string()),
            batches: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            report: None,
            batches: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.borrow().clone()
    }
}

impl Critic for ScriptedCritic {
    fn critique(&self, outputs: &[String], _instructions: &str) -> Result<String, CollaboratorError> {
        self.batches.borrow_mut().push(outputs.to_vec());
        self.report
            .clone()
            .ok_or_else(|| terminal_failure("critic"))
    }
}

/// Expert reviewer with fixed scores. Records `(text, domain)` per call.
pub struct ScriptedExpert {
    correctness: f64,
    style: f64,
    seen: RefCell<Vec<(String, String)>>,
}

impl ScriptedExpert {
    pub fn scoring(correctness: f64, style: f64) -> Self {
        Self {
            correctness,
            style,
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl ExpertReviewer for ScriptedExpert {
    fn review(&self, text: &str, domain: &str) -> ExpertEvaluation {
        self.seen
            .borrow_mut()
            .push((text.to_string(), domain.to_string()));
        ExpertEvaluation {
            correctness_score: Some(self.correctness),
            style_score: Some(self.style),
            notes: "scripted review".to_string(),
        }
    }
}

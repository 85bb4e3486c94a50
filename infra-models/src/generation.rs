use std::collections::HashMap;

use photon_domain::{DomainError, GenerationRequest, GenerationStats, TextGenerationPort};

/// Continues a prompt by walking its own word transitions, wrapping to the
/// first word when a word has no successor.
#[derive(Default)]
pub struct PromptEchoGenerator;

impl PromptEchoGenerator {
    pub fn new() -> Self {
        Self
    }
}

fn successors<'a>(words: &[&'a str]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut table: HashMap<&str, Vec<&str>> = HashMap::new();
    for pair in words.windows(2) {
        let next = table.entry(pair[0]).or_default();
        if !next.contains(&pair[1]) {
            next.push(pair[1]);
        }
    }
    table
}

impl TextGenerationPort for PromptEchoGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
        emit: &mut dyn FnMut(&str) -> bool,
    ) -> Result<GenerationStats, DomainError> {
        let words: Vec<&str> = request.prompt.split_whitespace().collect();
        let Some(&first) = words.first() else {
            return Err(DomainError::invalid_input("prompt is empty"));
        };
        let table = successors(&words);
        let sampling = request.sampling;

        let mut current = words[words.len() - 1];
        let mut generated_tokens = 0;
        while generated_tokens < request.max_new_tokens {
            let next = match table.get(current) {
                Some(candidates) if sampling.do_sample && candidates.len() > 1 => {
                    let window = candidates.len().min(sampling.top_k.max(1) as usize);
                    candidates[generated_tokens % window]
                }
                Some(candidates) => candidates[0],
                None => first,
            };
            if !emit(&format!(" {next}")) {
                tracing::debug!(generated_tokens, "consumer went away, stopping generation");
                break;
            }
            generated_tokens += 1;
            current = next;
        }
        Ok(GenerationStats { generated_tokens })
    }
}

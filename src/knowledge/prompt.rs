use crate::config::KnowledgeBaseConfig;

/// Query-rewriting prompt for the orchestration stage. The `$...$`
/// placeholders are filled in by the knowledge-base service.
pub const ORCHESTRATION_PROMPT: &str = r#"You are a query creation agent. You will be provided with a function and a description of what it searches over. The user will provide you a question, and your job is to determine the optimal query to use based on the user's question.
Always write the query in the language the user is writing in.
Here are a few examples of queries formed by other search function selection and query creation agents:

<examples>
  <example>
    <question> What if my vehicle is totaled in an accident? </question>
    <generated_query> what happens if my vehicle is totaled </generated_query>
  </example>
  <example>
    <question> I am relocating within the same state. Can I keep my current agent? </question>
    <generated_query> can I keep my current agent when moving in state </generated_query>
  </example>
</examples>

You should also pay attention to the conversation history between the user and the search engine in order to gain the context necessary to create the query.
Here's another example that shows how you should reference the conversation history when generating a query:

<example>
  <example_conversation_history>
    <example_conversation>
      <question> How many vehicles can I include in a quote in Kansas </question>
      <answer> You can include 5 vehicles in a quote if you live in Kansas </answer>
    </example_conversation>
    <example_conversation>
      <question> What about texas? </question>
      <answer> You can include 3 vehicles in a quote if you live in Texas </answer>
    </example_conversation>
  </example_conversation_history>
</example>

IMPORTANT: the elements in the <example> tags should not be assumed to have been provided to you to use UNLESS they are also explicitly given to you below.
All of the values and information within the examples (the questions, answers, and function calls) are strictly part of the examples and have not been provided to you.

Here is the current conversation history:
$conversation_history$

$output_format_instructions$"#;

pub const STOP_SEQUENCE: &str = "\nObservation";

/// Sampling settings shared by the generation and orchestration stages.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: i32,
    pub stop_sequences: Vec<String>,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 2048,
            stop_sequences: vec![STOP_SEQUENCE.to_string()],
        }
    }
}

/// Everything a retrieve-and-generate call needs, independent of the SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct RagRequest {
    pub question: String,
    pub session_id: Option<String>,
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub number_of_results: i32,
    pub answer_prompt: String,
    pub orchestration_prompt: String,
    pub inference: InferenceParams,
}

impl RagRequest {
    pub fn new(cfg: &KnowledgeBaseConfig, question: &str, session_id: Option<String>) -> Self {
        Self {
            question: question.trim().to_string(),
            session_id: session_id.filter(|s| !s.trim().is_empty()),
            knowledge_base_id: cfg.id.clone(),
            model_arn: cfg.model_id.clone(),
            number_of_results: cfg.number_of_results,
            answer_prompt: cfg.prompt.clone(),
            orchestration_prompt: ORCHESTRATION_PROMPT.to_string(),
            inference: InferenceParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::knowledge_base_config;

    #[test]
    fn request_carries_configuration_and_fixed_sampling() {
        let req = RagRequest::new(&knowledge_base_config(), "  what is covered? ", Some(String::new()));

        assert_eq!(req.question, "what is covered?");
        assert_eq!(req.session_id, None);
        assert_eq!(req.number_of_results, 5);
        assert_eq!(req.inference.temperature, 0.0);
        assert_eq!(req.inference.top_p, 1.0);
        assert_eq!(req.inference.max_tokens, 2048);
        assert_eq!(req.inference.stop_sequences, vec!["\nObservation".to_string()]);
    }

    #[test]
    fn orchestration_prompt_keeps_placeholders() {
        assert!(ORCHESTRATION_PROMPT.contains("$conversation_history$"));
        assert!(ORCHESTRATION_PROMPT.contains("$output_format_instructions$"));
    }
}

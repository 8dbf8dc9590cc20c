use crate::db::UserProfile;

/// Fixed system instruction for the advisory endpoint. The patient context
/// line, when present, is appended at the end.
const BASE_PROMPT: &str = "\
You are a medical advisor chatbot. Your role is to provide general health information and guidance.

Rules:
- You may greet the user and introduce yourself the first time, but do not greet on every message.
- Strictly answer only medical questions; politely refuse anything else.
- Do not make definitive diagnoses.
- Always recommend consulting a healthcare professional for specific medical advice.
- Provide evidence-based information and be clear about your limitations.
- Focus on general wellness and preventive care.";

/// One-line personalization summary derived from a profile.
pub fn patient_context(profile: &UserProfile) -> String {
    format!(
        "Patient Context: Age: {}, Gender: {}, Medical History: {}",
        profile.age,
        profile.gender,
        profile.past_illnesses.as_deref().unwrap_or("None"),
    )
}

/// Build the full system prompt, appending the patient context when present.
pub fn build_system_prompt(context: &str) -> String {
    let mut prompt = BASE_PROMPT.to_string();
    if !context.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt
}

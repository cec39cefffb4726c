//! Prompt templates for resume tailoring

use serde::{Deserialize, Serialize};

/// Prompt templates, loaded from configuration once per process
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

/// Parameters for prompt template substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptParams {
    pub job_content: String,
    pub resume_content: String,
}

impl PromptTemplates {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Render the user message sent alongside the system prompt
    pub fn render_user_message(&self, params: &PromptParams) -> String {
        let message = self
            .user
            .replace("{job}", params.job_content.trim())
            .replace("{resume}", params.resume_content.trim());

        log::debug!(
            "Rendered user message: {} chars (job {} chars, resume {} chars)",
            message.len(),
            params.job_content.len(),
            params.resume_content.len()
        );

        message
    }
}

pub const DEFAULT_USER_TEMPLATE: &str = "Job Description:
{job}

Current Resume:
{resume}

Please tailor this resume for the job description above.";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert resume tailoring specialist. Your job is to take a job description and a resume, then rewrite the resume to be perfectly tailored for that specific job while maintaining 100% truthfulness.

Your goals:
1. Match keywords from the job description naturally
2. Emphasize relevant experience and skills
3. Reorder and rewrite bullet points to highlight job-relevant achievements
4. Use action verbs and quantified results where possible
5. Ensure ATS compatibility
6. Make the resume compelling to human recruiters

CRITICAL FORMATTING REQUIREMENTS:
- Preserve the EXACT structure and line-by-line organization of the original resume
- Keep section headers exactly as they appear (e.g., "EXPERIENCE", "PROJECTS", "SKILLS")
- Maintain the same number of bullet points per job/section
- Keep job titles, company names, and dates in the same format and position
- Preserve spacing and paragraph breaks exactly as in the original

Rules:
- Never fabricate experience, skills, or achievements
- Keep the same overall structure and formatting intent
- Return ONLY the tailored resume text, no explanations
- Maintain professional tone throughout
- Focus on relevance and impact
- Output should match the original line-by-line structure

Input format: You'll receive the job description first, then the current resume.
Output: Return only the tailored resume content with identical structure to the original."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_rendering() {
        let templates = PromptTemplates::default();
        let params = PromptParams {
            job_content: "Seeking a backend engineer with Go experience\n".to_string(),
            resume_content: "Software Engineer, 5 years Python".to_string(),
        };

        let message = templates.render_user_message(&params);
        assert!(message.starts_with("Job Description:\nSeeking a backend engineer with Go experience\n\n"));
        assert!(message.contains("Current Resume:\nSoftware Engineer, 5 years Python"));
        assert!(message.ends_with("Please tailor this resume for the job description above."));
    }

    #[test]
    fn test_custom_template() {
        let templates = PromptTemplates::new("sys", "<JOB>{job}</JOB><CV>{resume}</CV>");
        let params = PromptParams {
            job_content: "jd".to_string(),
            resume_content: "cv".to_string(),
        };
        assert_eq!(templates.render_user_message(&params), "<JOB>jd</JOB><CV>cv</CV>");
    }

    #[test]
    fn test_default_system_prompt_demands_structure() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("line-by-line"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Never fabricate"));
    }
}

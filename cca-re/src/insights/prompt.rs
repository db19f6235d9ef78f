//! Prompt construction

use crate::reports::ComprehensiveReport;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are a career counsellor. You receive psychometric \
assessment results and reply with a single JSON object with the keys \"summary\" (string), \
\"strengths\" (array of strings), \"growth_areas\" (array of strings), \"career_paths\" \
(array of strings) and \"learning_tips\" (array of strings). Do not include any other text.";

/// User message describing every completed assessment
pub fn build_prompt(report: &ComprehensiveReport) -> String {
    let mut prompt = String::from("Assessment results:\n");

    for section in &report.sections {
        let _ = write!(prompt, "\n{} ({}): {}", section.test_name, section.test_code, section.result_code);
        if let Some(i) = &section.interpretation {
            let _ = write!(prompt, " - {}", i.title);
        }
        prompt.push('\n');

        let scores: Vec<String> = section
            .scores
            .dimensions
            .iter()
            .map(|d| format!("{} {:.0}%", d.code, d.percentage))
            .collect();
        let _ = writeln!(prompt, "Scores: {}", scores.join(", "));
    }

    let _ = write!(
        prompt,
        "\nCompleted {} of {} assessments.",
        report.completion.completed_count, report.completion.total
    );
    prompt
}

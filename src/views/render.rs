//! Plain-text renderings of the views, formatted as Discord markdown.

use std::fmt::Write;

use crate::api::types::{Disease, Qa};
use crate::auth::SessionState;
use crate::util::truncate_words;

use super::diseases::DiseaseBrowser;
use super::form::QaForm;
use super::qas::QaList;
use super::Fetch;

/// Words of article text shown in the QA detail preview.
pub const PREVIEW_WORDS: usize = 50;
/// Search hits listed per reply.
pub const MAX_LISTED_DISEASES: usize = 40;

fn join_codes(codes: &Option<Vec<String>>) -> String {
    codes.as_deref().map(|c| c.join(", ")).unwrap_or_default()
}

pub fn disease_info(disease: &Disease) -> String {
    format!(
        "**ID:** {}\n**Names:** {}\n**ICD10:** {}\n**ICD11:** {}\n**MESH:** {}\n**Category:** {}\n**Description:** {}",
        disease.id,
        disease.names.join(", "),
        join_codes(&disease.db_links.icd10),
        join_codes(&disease.db_links.icd11),
        join_codes(&disease.db_links.mesh),
        disease.category,
        disease.description,
    )
}

pub fn disease_search(browser: &DiseaseBrowser) -> String {
    match browser.ids() {
        Fetch::Idle | Fetch::Loading => return "Loading diseases...".to_string(),
        Fetch::Failed(reason) => return format!("Failed to load diseases: {}", reason),
        Fetch::Loaded(_) => {}
    }

    let found = browser.filtered();
    if found.is_empty() {
        return format!("No disease id starts with `{}`.", browser.search());
    }

    let selected = browser.selected_disease().map(|d| d.id.as_str());
    let mut out = format!("**Diseases** ({} found)\n", found.len());
    for hit in found.iter().take(MAX_LISTED_DISEASES) {
        let marker = if Some(hit.id) == selected { "▶" } else { " " };
        let _ = writeln!(out, "{} `{}` #{}", marker, hit.id, hit.original_index);
    }
    if found.len() > MAX_LISTED_DISEASES {
        let _ = writeln!(
            out,
            "...and {} more. Narrow the search.",
            found.len() - MAX_LISTED_DISEASES
        );
    }
    out
}

pub fn qa_list(list: &QaList) -> String {
    match list.entries() {
        Fetch::Idle => return "QA entries are not loaded. Use `/qa list`.".to_string(),
        Fetch::Loading => return "Loading QA entries...".to_string(),
        Fetch::Failed(reason) => {
            return format!("Failed to load QA entries for `{}`: {}", list.disease_id(), reason)
        }
        Fetch::Loaded(_) => {}
    }

    if list.is_empty() {
        return format!(
            "Nothing found for `{}`.\nUse `/qa new` to add the first QA.",
            list.disease_id()
        );
    }

    let mut out = format!("**QA entries for `{}`**\n", list.disease_id());
    if let Some(entries) = list.entries().loaded() {
        for (i, qa) in entries.iter().enumerate() {
            let marker = if i == list.selected_index() { "▶" } else { " " };
            let _ = writeln!(out, "{} {}. Article {}", marker, i + 1, qa.article.id);
        }
    }
    out.push_str("Use `/qa new` to add another.");
    out
}

pub fn selected_qa(qa: &Qa) -> String {
    let mut out = format!(
        "**Article {}**\n**Article Text:** {}\n",
        qa.article.id,
        truncate_words(&qa.article.text, PREVIEW_WORDS)
    );
    for (i, question) in qa.questions.iter().enumerate() {
        let _ = writeln!(out, "\n**Question {}:** {}", i + 1, question.text);
        for answer in &question.answers {
            let _ = writeln!(
                out,
                "  **Answer:** {}\n  **Answer Start:** {}",
                answer.text, answer.answer_start
            );
        }
    }
    out
}

pub fn draft(form: &QaForm) -> String {
    let mut out = String::new();
    let title = if form.is_editing() { "Editing QA" } else { "New QA" };
    let _ = writeln!(out, "**{}**", title);
    let _ = writeln!(out, "**Disease ID:** {}", form.disease_id());
    let article_id = if form.article_id().is_empty() { "(unset)" } else { form.article_id() };
    let _ = writeln!(out, "**Article ID:** {}", article_id);

    match (form.article(), form.article_text()) {
        (Fetch::Loading, _) => out.push_str("\n_Loading article..._\n\n"),
        (_, Some(text)) => {
            let _ = writeln!(out, "```\n{}\n```", text);
        }
        _ => out.push_str("\n_Article text will appear here_\n\n"),
    }

    for (i, question) in form.questions().iter().enumerate() {
        let _ = writeln!(out, "**Question {}:** {}", i + 1, question.text);
        for (j, answer) in question.answers.iter().enumerate() {
            let _ = writeln!(
                out,
                "  Answer {}: \"{}\" (start {})",
                j + 1,
                answer.text,
                answer.answer_start
            );
        }
        if form.armed() == Some(i) {
            out.push_str("  _Please select an answer_\n");
        }
    }
    if form.questions().is_empty() {
        out.push_str("_No questions yet. Use `/draft add-question`._\n");
    }
    if form.is_submitting() {
        out.push_str("\n_Submitting..._\n");
    }
    out
}

pub fn session(state: &SessionState) -> String {
    match state {
        SessionState::Loading => "Resolving your session...".to_string(),
        SessionState::Unauthenticated => {
            "You are not logged in. Use `/curator login`.".to_string()
        }
        SessionState::Redirecting(login) => format!(
            "Finish logging in at {} and confirm the code **{}**.",
            login.verification_uri, login.user_code
        ),
        SessionState::AuthenticatedNoToken(_) => "Acquiring an access token...".to_string(),
        SessionState::Ready(creds) => format!(
            "Logged in. Token valid until {}.",
            creds.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
    }
}

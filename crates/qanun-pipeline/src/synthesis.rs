//! Response synthesis: the three answer strategies.
//!
//! Each strategy builds a system prompt, the windowed history, and the
//! current question, then issues one completion call. Only the legal
//! strategy consumes search hits; it appends a deterministic references
//! block so citation numbers in the answer always line up with the source
//! list, regardless of what the model actually cited.

use qanun_core::types::SourceHit;
use tracing::debug;

use crate::completion::{ChatMessage, CompletionClient, CompletionRequest};
use crate::error::{PipelineError, Result};

/// Shown when the search integration is not configured.
pub const SEARCH_UNCONFIGURED_NOTICE: &str =
    "Hüquqi axtarış xidməti konfiqurasiya edilməyib. Zəhmət olmasa, daha sonra cəhd edin.";

/// Shown when no trusted source matched the question.
pub const NO_SOURCE_NOTICE: &str = "Sualınızla bağlı etibarlı mənbə tapılmadı.";

const CASUAL_SYSTEM_PROMPT: &str = "Sən Azərbaycan dilində danışan köməkçi bir hüquqşünassan.\n\
    İstifadəçi hüquqi bir sual vermədikdə, sərbəst və köməkçi bir şəkildə cavab ver.\n\
    Onları hüquqi bir sual verməyə təşviq et.\n\
    Cavabı sadə və təbii bir dildə, xüsusi formatlama olmadan yaz.\n\
    \n\
    VACİB QAYDALAR:\n\
    - İstifadəçinin adını bilirsənsə, hər cavabda salam vermə!\n\
    - Salam vermək üçün yalnız ilk dəfə və ya uzun fasilədən sonra istifadə et.\n\
    - Cavablarını təbii və dostcasına saxla.\n\
    - İstifadəçinin adını yalnız məzmunla əlaqəli olduqda istifadə et.";

const VAGUE_SYSTEM_PROMPT: &str = "Sən Azərbaycan dilində danışan hüquqşünas köməkçisisən.\n\
    İstifadəçi hüquqi bir məsələ haqqında qeyri-müəyyən məlumat verib.\n\
    Onlardan daha ətraflı məlumat almaq üçün suallar ver.\n\
    Məsələn:\n\
    - \"Hansı növ hüquqi məsələdir?\"\n\
    - \"Nə vaxt baş verib?\"\n\
    - \"Kimlər iştirak edib?\"\n\
    - \"Hansı sənədlər var?\"\n\
    \n\
    Cavabı sadə və dostcasına, xüsusi formatlama olmadan təqdim et.\n\
    \n\
    VACİB QAYDALAR:\n\
    - İstifadəçinin adını bilirsənsə, hər cavabda salam vermə!\n\
    - Salam vermək üçün yalnız ilk dəfə və ya uzun fasilədən sonra istifadə et.\n\
    - Cavablarını təbii və dostcasına saxla.\n\
    - İstifadəçinin adını yalnız məzmunla əlaqəli olduqda istifadə et.";

const LEGAL_SYSTEM_PROMPT: &str = "Sən Azərbaycan qanunvericiliyi üzrə ixtisaslaşmış bir hüquqşünas köməkçisisən.\n\
    Verilmiş mənbələrin qısa məzmununa və söhbət tarixçəsinə əsaslanaraq istifadəçinin sualına cavab hazırla.\n\
    Cavabların yalnız Azərbaycan dilində olmalıdır.\n\
    Cavabında mütləq istinad etdiyin mənbələri nömrələrlə qeyd et, məsələn: [1], [2] və s.\n\
    Cavabı Markdown formatında təqdim et. Əsas terminləri **qalın** yaz, siyahıları nömrələnmiş bəndlərlə ver.\n\
    \n\
    VACİB QAYDALAR:\n\
    - İstifadəçinin adını bilirsənsə, hər cavabda salam vermə!\n\
    - Cavablarını professional və dəqiq saxla.\n\
    - İstifadəçinin adını yalnız məzmunla əlaqəli olduqda istifadə et.\n\
    - Birbaşa suala cavab ver, lazımsız salamlamalardan çəkin.";

/// Free-form friendly reply for non-legal conversation.
pub async fn synthesize_casual(
    client: &dyn CompletionClient,
    model: &str,
    question: &str,
    history: &[ChatMessage],
) -> Result<String> {
    let messages = assemble(CASUAL_SYSTEM_PROMPT, history, question.to_string());
    client
        .complete(CompletionRequest::new(model, messages))
        .await
        .map_err(|e| PipelineError::Synthesis(format!("casual reply failed: {}", e)))
}

/// Clarifying questions for a vague legal mention.
pub async fn synthesize_vague(
    client: &dyn CompletionClient,
    model: &str,
    question: &str,
    history: &[ChatMessage],
) -> Result<String> {
    let messages = assemble(VAGUE_SYSTEM_PROMPT, history, question.to_string());
    client
        .complete(CompletionRequest::new(model, messages))
        .await
        .map_err(|e| PipelineError::Synthesis(format!("clarifying reply failed: {}", e)))
}

/// Cited legal answer grounded in the given search hits.
///
/// With no hits the static no-source notice is returned and the model is not
/// called. Otherwise the hits are numbered into a context block, the model
/// is instructed to cite by number, and a references block is appended with
/// exactly one entry per hit, in hit order.
pub async fn synthesize_legal(
    client: &dyn CompletionClient,
    model: &str,
    question: &str,
    history: &[ChatMessage],
    hits: &[SourceHit],
) -> Result<String> {
    if hits.is_empty() {
        return Ok(NO_SOURCE_NOTICE.to_string());
    }
    debug!(hits = hits.len(), "Synthesizing legal answer");

    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "Mənbə [{}]: {} ({})\n\nMəzmun: {}",
                i + 1,
                hit.title,
                hit.link,
                hit.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let user_content = format!("Sual: {}\n\nMənbələr:\n{}", question, context);
    let messages = assemble(LEGAL_SYSTEM_PROMPT, history, user_content);

    let answer = client
        .complete(CompletionRequest::new(model, messages))
        .await
        .map_err(|e| PipelineError::Synthesis(format!("legal answer failed: {}", e)))?;

    Ok(format!("{}\n\n{}", answer, render_references(hits)))
}

fn assemble(system_prompt: &str, history: &[ChatMessage], user_content: String) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_content));
    messages
}

/// Markdown references block, one numbered link per hit.
fn render_references(hits: &[SourceHit]) -> String {
    let lines = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. [{}]({})", i + 1, hit.title, hit.link))
        .collect::<Vec<_>>()
        .join("\n");
    format!("**İstinadlar:**\n{}", lines)
}

// =============================================================================
// Tests
// =============================================================================

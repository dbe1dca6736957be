//! Prompt templates
//!
//! Templates use `{context}` and `{input}` placeholders filled by the
//! executor; composite prompts expose builder functions instead. Wording is
//! deliberately terse - prompt tuning happens in ops, not in code review.

/// 10-second-interval video summary from transcript context
pub const VIDEO_SUMMARY: &str = "\
You are a YouTube content analyst. Using the transcript below, write a \
running summary of the video in 10-second intervals, then a short overall \
summary.\n\nTranscript:\n{context}\n\nTask: {input}";

/// Single-comment emotion classification; the reply must be bare JSON
pub const COMMENT_REACTION: &str = "\
Classify the emotion of this YouTube comment. Reply with pure JSON only, no \
code fences, in the form {\"emotion\": N} where N is 1=positive, 2=negative, \
3=neutral, 4=advice or opinion.\n\nComment:\n{context}\n\nTask: {input}";

/// Per-emotion bucket summarization; strict JSON list of {"content": ...}
pub const COMMENT_SUMMARY: &str = "\
Summarize the recurring points in these YouTube comments as 1-5 short \
statements. Reply with pure JSON only, no code fences: a list of objects \
with a \"content\" field.\n\nComments:\n{context}\n\nTask: {input}";

/// Meaning-based re-chunking of the focus window; strict JSON triplets
pub const MEANING_CHUNK: &str = "\
The context is a JSON list of [text, start_sec, end_sec] transcript chunks \
around a viewer drop-off point. Regroup them into meaning-aligned segments. \
Reply with pure JSON only, no code fences: a list of [text, start_sec, \
end_sec] triplets covering the same time range.\n\nChunks:\n{context}\n\n\
Task: {input}";

/// Algorithm-optimization analysis over structured video/channel stats
pub const ALGORITHM_OPTIMIZATION: &str = "\
You are a YouTube algorithm consultant. Using the video and channel data \
below (and prior analysis cases, when present), assess how well this video \
is optimized for recommendation and search, then give concrete improvements \
for title, description, tags, thumbnail and upload strategy.\n\n\
Data:\n{context}\n\nTask: {input}";

/// Real-time trend triage; strict JSON {"trends": [{"keyword", "score"}]}
pub const TREND_ANALYSIS: &str = "\
The context holds raw trending searches for a region. Pick the entries most \
suitable as YouTube content topics. Reply with pure JSON only, no code \
fences: {\"trends\": [{\"keyword\": string, \"score\": 0-100}]}.\n\n\
Trends:\n{context}\n\nTask: {input}";

/// Channel-tailored trend keywords; same strict JSON shape as TREND_ANALYSIS
pub const CHANNEL_TREND: &str = "\
The context describes a YouTube channel (concept and target audience). \
Invent trend keywords tailored to this channel. Reply with pure JSON only, \
no code fences: {\"trends\": [{\"keyword\": string, \"score\": 0-100}]}.\n\n\
Channel:\n{context}\n\nTask: {input}";

/// Idea generation; strict JSON list of {"title","description","tags"}
pub const IDEA: &str = "\
You develop new YouTube content ideas. \"Origin\" describes the creator's \
channel and video; \"popular\" holds similar currently-popular videos. \
Propose 3 new video ideas that fit the channel and ride the popular \
context. Reply with pure JSON only, no code fences: a list of objects with \
\"title\", \"description\" and \"tags\" (list of strings) fields.\n\n\
Origin:\n{origin}\n\nPopular:\n{popularity}\n\nTask: {input}";

/// Viewer-escape analysis prompt (single composed prompt, no map-reduce)
#[allow(clippy::too_many_arguments)]
pub fn viewer_escape_prompt(
    cause_chunks: &str,
    improvement_chunks: &str,
    editing_flow_chunks: &str,
    worst_sec: u64,
    focus_start: u64,
    focus_end: u64,
    video_length: u64,
    video_title: &str,
    video_description: &str,
    channel_concept: &str,
    channel_target: &str,
    channel_hashtag: &str,
) -> String {
    format!(
        "You analyze where and why viewers leave a YouTube video.\n\
         The sharpest retention drop is at {worst_sec}s (focus window \
         {focus_start}s-{focus_end}s of {video_length}s).\n\n\
         Video: {video_title}\nDescription: {video_description}\n\
         Channel concept: {channel_concept}\nTarget audience: {channel_target}\n\
         Channel hashtag: {channel_hashtag}\n\n\
         Retrieved transcript evidence:\n\
         [cause]\n{cause_chunks}\n\n[improvement]\n{improvement_chunks}\n\n\
         [editing flow]\n{editing_flow_chunks}\n\n\
         Explain the likely causes of the drop, concrete improvements, and a \
         better editing flow for the focus window. Answer in prose."
    )
}

/// Grounding questions for viewer-escape retrieval
pub const ESCAPE_QUESTION_CAUSE: &str =
    "Explain the causes of viewer drop-off in this video.";
pub const ESCAPE_QUESTION_IMPROVEMENT: &str =
    "Suggest improvements to reduce viewer drop-off in this video.";
pub const ESCAPE_QUESTION_EDITING_FLOW: &str =
    "Propose a suitable editing flow for this video.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_have_placeholders() {
        for template in [
            VIDEO_SUMMARY,
            COMMENT_REACTION,
            COMMENT_SUMMARY,
            MEANING_CHUNK,
            ALGORITHM_OPTIMIZATION,
            TREND_ANALYSIS,
            CHANNEL_TREND,
        ] {
            assert!(template.contains("{context}"));
            assert!(template.contains("{input}"));
        }
        assert!(IDEA.contains("{origin}"));
        assert!(IDEA.contains("{popularity}"));
    }

    #[test]
    fn test_viewer_escape_prompt_fills_fields() {
        let prompt = viewer_escape_prompt(
            "c", "i", "e", 90, 80, 100, 300, "title", "desc", "concept", "target", "#tag",
        );
        assert!(prompt.contains("90s"));
        assert!(prompt.contains("80s-100s"));
        assert!(prompt.contains("concept"));
    }
}

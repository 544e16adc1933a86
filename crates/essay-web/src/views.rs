//! HTML pages.
//!
//! Every piece of user or stored text passes through `html_escape` before it
//! reaches the page; annotated spans are rendered from [`Segment`]s, never by
//! substituting markup into the essay body.

use essay_core::annotation::{AnnotatedBody, Segment};
use essay_core::grade_scale::{GradeTier, ScoreTier};
use essay_core::history::{HistoryEntry, HistorySummary};
use essay_core::hover::{active_feedback, HoverState};
use essay_core::models::EssayRecord;
use essay_core::routes::Route;
use essay_core::session::Identity;
use essay_core::submission::SubmissionDraft;
use html_escape::{encode_double_quoted_attribute, encode_text};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f7f8fa; }
header { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1.5rem; background: #fff; border-bottom: 1px solid #e4e7eb; }
header a { margin-left: 1rem; }
main { max-width: 56rem; margin: 2rem auto; padding: 0 1.5rem; }
.card { background: #fff; border: 1px solid #e4e7eb; border-radius: 0.5rem; padding: 1.25rem; margin-bottom: 1rem; }
.stats { display: flex; gap: 1rem; }
.stats .card { flex: 1; text-align: center; }
.error { color: #b42318; }
.grade-excellent, .score-excellent { color: #027a48; }
.grade-good, .score-good { color: #175cd3; }
.grade-fair, .score-fair { color: #b54708; }
.grade-other, .score-poor { color: #b42318; }
.essay { white-space: pre-wrap; line-height: 1.6; }
.mark { background: #fef0c7; color: inherit; text-decoration: none; border-bottom: 2px solid #fdb022; }
.mark.active { background: #fdb022; }
.annotation-panel { border-left: 4px solid #fdb022; }
.hint { color: #616e7c; }
"#;

fn page(title: &str, identity: Option<&Identity>, content: &str) -> String {
    let nav = match identity {
        Some(identity) => format!(
            r#"<span>{name}</span><a href="{dashboard}">Dashboard</a><a href="{new}">Grade an essay</a><form method="post" action="/logout" style="display:inline"><button type="submit">Sign out</button></form>"#,
            name = encode_text(identity.display_name()),
            dashboard = Route::Dashboard,
            new = Route::GradeNew,
        ),
        None => format!(
            r#"<a href="{login}">Sign in</a><a href="{signup}">Sign up</a>"#,
            login = Route::Login,
            signup = Route::SignUp,
        ),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Essay Grader</title>
<style>{STYLE}</style>
</head>
<body>
<header><a href="/"><strong>Essay Grader</strong></a><nav>{nav}</nav></header>
<main>
{content}
</main>
</body>
</html>
"#,
        title = encode_text(title),
    )
}

pub fn landing(identity: Option<&Identity>) -> String {
    let cta = match identity {
        Some(_) => format!(r#"<a href="{}">Grade your essay</a>"#, Route::GradeNew),
        None => format!(
            r#"<a href="{}">Get started</a> or <a href="{}">sign in</a>"#,
            Route::SignUp,
            Route::Login
        ),
    };
    let content = format!(
        r#"<h1>Grade your essays with detailed feedback</h1>
<p>Submit an essay and get a score, a letter grade, a per-criterion breakdown and inline comments on your text.</p>
<p>{cta}</p>
<div class="stats">
<div class="card"><h3>Instant Analysis</h3><p>Scores arrive within seconds of submitting.</p></div>
<div class="card"><h3>Detailed Scoring</h3><p>Five criteria from content to evidence.</p></div>
<div class="card"><h3>Actionable Feedback</h3><p>Hover highlighted passages to read targeted comments.</p></div>
</div>"#
    );
    page("Home", identity, &content)
}

pub fn login(error: Option<&str>) -> String {
    let error = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, encode_text(msg)))
        .unwrap_or_default();
    let content = format!(
        r#"<div class="card">
<h1>Welcome Back</h1>
<p>Sign in to access your essay dashboard.</p>
{error}
<form method="post" action="{login}">
<label for="token">Session token</label><br>
<input id="token" name="token" type="password" autocomplete="off" size="70" required>
<button type="submit">Sign in</button>
</form>
<p class="hint">No account yet? <a href="{signup}">Sign up here</a>.</p>
</div>"#,
        login = Route::Login,
        signup = Route::SignUp,
    );
    page("Sign in", None, &content)
}

pub fn signup() -> String {
    let content = format!(
        r#"<div class="card">
<h1>Create Your Account</h1>
<p>Accounts are provisioned by the identity provider. An administrator issues a session token with:</p>
<pre>essay-db session create &lt;user-id&gt; --email you@example.com</pre>
<p>Paste that token on the <a href="{login}">sign-in page</a>.</p>
</div>"#,
        login = Route::Login,
    );
    page("Sign up", None, &content)
}

pub fn dashboard(identity: &Identity, entries: &[HistoryEntry]) -> String {
    let summary = HistorySummary::from_entries(entries);
    let best = summary
        .best_score
        .map_or_else(|| "–".to_string(), |score| score.to_string());
    let average = if summary.total == 0 {
        "–".to_string()
    } else {
        summary.average_score.to_string()
    };

    let list = if entries.is_empty() {
        format!(
            r#"<div class="card hint"><p>No essays yet.</p><p><a href="{}">Grade your first essay</a></p></div>"#,
            Route::GradeNew
        )
    } else {
        entries.iter().map(history_row).collect::<Vec<_>>().join("\n")
    };

    let content = format!(
        r#"<h1>Welcome, {name}</h1>
<div class="stats">
<div class="card"><h3>Essays graded</h3><p>{total}</p></div>
<div class="card"><h3>Average score</h3><p>{average}</p></div>
<div class="card"><h3>Best score</h3><p>{best}</p></div>
</div>
<h2>Your essays</h2>
{list}"#,
        name = encode_text(identity.display_name()),
        total = summary.total,
    );
    page("Dashboard", Some(identity), &content)
}

fn history_row(entry: &HistoryEntry) -> String {
    format!(
        r#"<div class="card"><a href="{href}"><strong>{title}</strong></a> <span class="hint">{date}</span> <span class="{tier}">{grade}</span> <span class="{score_tier}">{score}/100</span></div>"#,
        href = encode_double_quoted_attribute(&entry.result_path),
        title = encode_text(&entry.title),
        date = encode_text(&entry.submitted_on),
        tier = entry.grade_tier.slug(),
        grade = encode_text(&entry.grade),
        score_tier = ScoreTier::from_score(entry.score).slug(),
        score = entry.score,
    )
}

pub fn grade_new(identity: &Identity, draft: &SubmissionDraft, error: Option<&str>) -> String {
    let error = error
        .map(|msg| format!(r#"<p class="error" role="alert">{}</p>"#, encode_text(msg)))
        .unwrap_or_default();
    let ready = if draft.can_submit() {
        ""
    } else {
        r#"<p class="hint">Enter a title and your essay to submit.</p>"#
    };
    let content = format!(
        r#"<p><a href="{dashboard}">Back to Dashboard</a></p>
<div class="card">
<h1>Grade Your Essay</h1>
{error}
<form method="post" action="{action}">
<label for="title">Essay Topic/Title</label><br>
<input id="title" name="title" size="60" value="{title}"><br><br>
<label for="body">Your Essay</label><br>
<textarea id="body" name="body" rows="18" cols="80">{body}</textarea>
<p class="hint">{words} words</p>
{ready}
<button type="submit">Grade essay</button>
</form>
</div>"#,
        dashboard = Route::Dashboard,
        action = Route::GradeNew,
        title = encode_double_quoted_attribute(&draft.title),
        body = encode_text(&draft.body),
        words = draft.word_count(),
    );
    page("Grade an essay", Some(identity), &content)
}

pub fn grade_result(
    identity: &Identity,
    record: &EssayRecord,
    body: &AnnotatedBody,
    hover: &HoverState,
) -> String {
    let criteria = record
        .criteria
        .iter()
        .map(|criterion| {
            format!(
                r#"<div class="card"><strong>{name}</strong> <span class="{tier}">{score}/100</span><br><progress max="100" value="{score}"></progress><p class="hint">{feedback}</p></div>"#,
                name = encode_text(&criterion.name),
                tier = ScoreTier::from_score(criterion.score).slug(),
                score = criterion.score,
                feedback = encode_text(&criterion.feedback),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let panel = match active_feedback(body, hover) {
        Some(feedback) => format!(
            r#"<aside class="card annotation-panel"><p>{}</p><p><a href="?">Close</a></p></aside>"#,
            encode_text(feedback)
        ),
        None if body.marked_count() > 0 => {
            r#"<aside class="card hint">Hover over highlighted text to see specific feedback.</aside>"#
                .to_string()
        }
        None => String::new(),
    };

    let content = format!(
        r#"<p><a href="{dashboard}">Back to Dashboard</a> · <a href="{grade_new}">Grade Another Essay</a></p>
<div class="card">
<h1>{title}</h1>
<p>Overall Score: <span class="{score_tier}">{score}/100</span> · Grade <span class="{grade_tier}">{grade}</span></p>
</div>
<h2>Criteria</h2>
{criteria}
<h2>Your essay</h2>
<div class="card essay">{essay}</div>
{panel}"#,
        dashboard = Route::Dashboard,
        grade_new = Route::GradeNew,
        title = encode_text(&record.title),
        score_tier = ScoreTier::from_score(record.score).slug(),
        score = record.score,
        grade_tier = GradeTier::from_grade(&record.grade).slug(),
        grade = encode_text(&record.grade),
        essay = render_segments(body, hover),
    );
    page(&record.title, Some(identity), &content)
}

/// Essay body with marked spans as links that select the hover state.
pub fn render_segments(body: &AnnotatedBody, hover: &HoverState) -> String {
    let active = match hover {
        HoverState::Hovering(text) => Some(text.as_str()),
        HoverState::Idle => None,
    };
    let mut out = String::new();
    for segment in body.segments() {
        match segment {
            Segment::Plain(text) => out.push_str(&encode_text(text)),
            Segment::Annotated { text, feedback } => {
                let class = if active == Some(text.as_str()) {
                    "mark active"
                } else {
                    "mark"
                };
                out.push_str(&format!(
                    r#"<a class="{class}" href="?hover={href}" title="{tip}" data-feedback="{tip}">{text}</a>"#,
                    href = urlencoding::encode(text),
                    tip = encode_double_quoted_attribute(feedback),
                    text = encode_text(text),
                ));
            }
        }
    }
    out
}

pub fn not_found(identity: Option<&Identity>) -> String {
    let content = format!(
        r#"<div class="card"><h1>Not found</h1><p>The page or essay you asked for does not exist.</p><p><a href="{}">Back to Dashboard</a></p></div>"#,
        Route::Dashboard
    );
    page("Not found", identity, &content)
}

pub fn error_page(identity: Option<&Identity>, message: &str) -> String {
    let content = format!(
        r#"<div class="card"><h1>Something went wrong</h1><p class="error">{}</p><p><a href="{}">Back to Dashboard</a></p></div>"#,
        encode_text(message),
        Route::Dashboard
    );
    page("Error", identity, &content)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use essay_core::annotation::annotate;
    use essay_core::models::AnnotationMap;

    use super::*;

    fn body_with_mark() -> AnnotatedBody {
        let mut map = AnnotationMap::new();
        map.insert("climate change".into(), "Key \"theme\"".into());
        annotate("<b>climate change</b> and climate change", &map)
    }

    #[test]
    fn segments_escape_text_and_mark_first_occurrence() {
        let html = render_segments(&body_with_mark(), &HoverState::Idle);
        assert!(html.starts_with("&lt;b&gt;"));
        assert_eq!(html.matches(r#"class="mark""#).count(), 1);
        assert!(html.contains("href=\"?hover=climate%20change\""));
        assert!(html.contains("data-feedback=\"Key &quot;theme&quot;\""));
        assert!(html.ends_with(" and climate change"));
    }

    #[test]
    fn active_span_is_highlighted() {
        let html = render_segments(
            &body_with_mark(),
            &HoverState::Hovering("climate change".into()),
        );
        assert!(html.contains(r#"class="mark active""#));
    }

    #[test]
    fn grade_new_preserves_escaped_draft() {
        let identity = Identity::new("u1");
        let draft = SubmissionDraft::new("\"Quoted\"", "one two </textarea>");
        let html = grade_new(&identity, &draft, Some("essay title is required"));
        assert!(html.contains("value=\"&quot;Quoted&quot;\""));
        assert!(html.contains("one two &lt;/textarea&gt;"));
        assert!(html.contains("3 words"));
        assert!(html.contains("essay title is required"));
        assert!(!html.contains("Enter a title and your essay"));
    }

    #[test]
    fn grade_new_hints_until_draft_is_complete() {
        let identity = Identity::new("u1");
        let blank = grade_new(&identity, &SubmissionDraft::default(), None);
        assert!(blank.contains("Enter a title and your essay to submit."));

        let untitled = grade_new(&identity, &SubmissionDraft::new(" ", "some text"), None);
        assert!(untitled.contains("Enter a title and your essay to submit."));
    }

    #[test]
    fn dashboard_empty_state() {
        let html = dashboard(&Identity::new("u1"), &[]);
        assert!(html.contains("No essays yet."));
        assert!(html.contains("<p>0</p>"));
    }

    #[test]
    fn result_page_shows_panel_only_while_hovering() {
        let identity = Identity::new("u1");
        let record = EssayRecord {
            id: "e1".into(),
            owner_id: "u1".into(),
            title: "Climate".into(),
            body: "<b>climate change</b> and climate change".into(),
            grade: "A-".into(),
            score: 91,
            created_at: Utc::now(),
            criteria: Vec::new(),
            annotations: AnnotationMap::new(),
        };
        let body = body_with_mark();

        let idle = grade_result(&identity, &record, &body, &HoverState::Idle);
        assert!(!idle.contains(r#"<aside class="card annotation-panel">"#));
        assert!(idle.contains("Hover over highlighted text"));
        assert!(idle.contains(r#"<a href="/grade/new">Grade Another Essay</a>"#));

        let hovering = grade_result(
            &identity,
            &record,
            &body,
            &HoverState::Hovering("climate change".into()),
        );
        assert!(hovering.contains(r#"<aside class="card annotation-panel"><p>Key "theme"</p>"#));
    }
}

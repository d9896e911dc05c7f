use crate::models::StructuredJob;

const MAX_SKILLS_SHOWN: usize = 5;

pub fn subject(match_count: usize) -> String {
    format!("{match_count} New Job Matches for You!")
}

/// HTML body: heading, total match count, then one block per job in `top_jobs`.
pub fn render_digest(match_count: usize, top_jobs: &[StructuredJob]) -> String {
    let mut html = String::from("<h2>Your AI Job Agent Daily Digest</h2>");
    html.push_str(&format!(
        "<p>Found {match_count} high-fit opportunities in the last 24 hours.</p><hr/>"
    ));

    for job in top_jobs {
        let fields = &job.fields;
        let skills = fields
            .required_skills
            .iter()
            .take(MAX_SKILLS_SHOWN)
            .map(|s| escape(s))
            .collect::<Vec<_>>()
            .join(", ");

        html.push_str(&format!(
            r#"
<div style='margin-bottom: 20px;'>
    <h3 style='color: #2563eb;'>{title} (Match: {score}%)</h3>
    <p><strong>Company:</strong> {company}</p>
    <p><strong>Location:</strong> {location} ({remote})</p>
    <p><strong>Top Skills:</strong> {skills}</p>
</div>
<hr/>
"#,
            title = escape(fields.job_title.as_deref().unwrap_or("Untitled role")),
            score = job.fit_score.unwrap_or(0.0),
            company = escape(fields.company_name.as_deref().unwrap_or("N/A")),
            location = escape(fields.location.as_deref().unwrap_or("N/A")),
            remote = fields.remote_policy.as_str(),
        ));
    }

    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::RemotePolicy;
    use crate::models::StructuredFields;
    use chrono::Utc;

    fn job(title: &str, company: Option<&str>, skills: &[&str], score: f64) -> StructuredJob {
        let fields = StructuredFields {
            job_title: Some(title.to_string()),
            company_name: company.map(str::to_string),
            location: Some("Austin, TX".to_string()),
            remote_policy: RemotePolicy::Hybrid,
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let mut job = StructuredJob::from_extraction("j", fields, Utc::now());
        job.fit_score = Some(score);
        job
    }

    #[test]
    fn test_subject_carries_count() {
        assert_eq!(subject(6), "6 New Job Matches for You!");
    }

    #[test]
    fn test_render_includes_header_count_and_job_details() {
        let html = render_digest(7, &[job("SRE", Some("Acme"), &["Go"], 82.5)]);
        assert!(html.contains("Your AI Job Agent Daily Digest"));
        assert!(html.contains("Found 7 high-fit opportunities"));
        assert!(html.contains("SRE (Match: 82.5%)"));
        assert!(html.contains("<strong>Company:</strong> Acme"));
        assert!(html.contains("Austin, TX (Hybrid)"));
    }

    #[test]
    fn test_missing_company_renders_na_and_skills_capped_at_five() {
        let skills = ["a", "b", "c", "d", "e", "f"];
        let html = render_digest(1, &[job("SRE", None, &skills, 90.0)]);
        assert!(html.contains("<strong>Company:</strong> N/A"));
        assert!(html.contains("a, b, c, d, e</p>"));
        assert!(!html.contains(", f"));
    }

    #[test]
    fn test_interpolated_text_is_escaped() {
        let html = render_digest(1, &[job("<script>x</script>", Some("A & B"), &[], 70.0)]);
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(html.contains("A &amp; B"));
        assert!(!html.contains("<script>"));
    }
}

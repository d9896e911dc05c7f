// Prompt constants for posting extraction.

/// System prompt for extraction: enforces JSON-only, conservative output.
pub const EXTRACTION_SYSTEM: &str = "You are an expert DevSecOps and cloud engineering job analyst. \
    You turn raw job descriptions into precise, machine-readable JSON. \
    You MUST respond with valid JSON only. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies. \
    If a field is not explicitly stated, use null. Never infer or invent requirements. \
    If the text is not a job description at all, respond with the single word null.";

/// Extraction prompt template. Replace `{job_description}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract structured data from the job description below.

### JOB DESCRIPTION
"""
{job_description}
"""

### JSON SCHEMA (return exactly these fields)
{
  "job_title": "string",
  "company_name": "string | null",
  "location": "string | null",
  "remote_policy": "Remote" | "Hybrid" | "Onsite" | "Unknown",
  "required_skills": ["string"],
  "preferred_skills": ["string"],
  "years_of_experience": {
    "min_years": "number | null",
    "max_years": "number | null",
    "raw_text": "string | null"
  },
  "clearance_required": "boolean",
  "visa_sponsorship": "boolean | null",
  "salary_range": {
    "min": "number | null",
    "max": "number | null",
    "currency": "string | null",
    "frequency": "annual" | "hourly" | null
  },
  "top_3_responsibilities": ["string"],
  "tech_stack_summary": "string"
}

### NORMALIZATION
- remote_policy: "work from home", "WfH" or "anywhere" -> "Remote"; "split" or "2 days in office" -> "Hybrid".
- years_of_experience: "5-8 years" -> min_years=5, max_years=8; "5+ years" -> min_years=5, max_years=null.
- clearance_required: true when the text asks for "Secret", "TS/SCI", "Polygraph" or "Citizen required".
- visa_sponsorship: true if offered, false if "No sponsorship", null otherwise.
- required_skills: concrete technical skills only (e.g. AWS, Terraform), not soft skills.

### EXAMPLE
Input: "We are looking for a Senior DevOps Engineer with 5+ years of experience in AWS and Terraform. You'll spend 3 days a week in our Nairobi office. Salary is $120k-$150k."
Output:
{
  "job_title": "Senior DevOps Engineer",
  "company_name": null,
  "location": "Nairobi",
  "remote_policy": "Hybrid",
  "required_skills": ["AWS", "Terraform"],
  "preferred_skills": [],
  "years_of_experience": {"min_years": 5, "max_years": null, "raw_text": "5+ years"},
  "clearance_required": false,
  "visa_sponsorship": null,
  "salary_range": {"min": 120000, "max": 150000, "currency": "USD", "frequency": "annual"},
  "top_3_responsibilities": ["Manage AWS infrastructure", "Implement Terraform", "Collaborate on DevOps best practices"],
  "tech_stack_summary": "AWS, Terraform"
}
"#;

pub fn build_extraction_prompt(job_description: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE.replace("{job_description}", job_description)
}

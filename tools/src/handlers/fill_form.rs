use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conhub_ports::store::ProfileStorePort;
use conhub_ports::{PortError, PortResult};
use regex::Regex;

use crate::handlers::templates::template_for;
use crate::types::{get_str, get_str_owned, ToolArgs, ToolOutput, ToolType};
use crate::ToolHandler;

/// **fill_form** (§4.8): selects a named Markdown template, substitutes
/// `{placeholder}` tokens from profile fields and caller-supplied
/// `additional_info`, and reports which fields were and weren't filled.
pub struct FillFormHandler {
    profile_store: Arc<dyn ProfileStorePort>,
}

impl FillFormHandler {
    pub fn new(profile_store: Arc<dyn ProfileStorePort>) -> Self {
        Self { profile_store }
    }

    fn profile_fields(profile: &conhub_models::profile::StudentProfile) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        if let Some(v) = &profile.identity.name {
            fields.insert("name".to_string(), v.clone());
        }
        if let Some(v) = &profile.identity.student_id {
            fields.insert("student_id".to_string(), v.clone());
        }
        if let Some(v) = &profile.identity.email {
            fields.insert("email".to_string(), v.clone());
        }
        if let Some(v) = &profile.identity.phone {
            fields.insert("phone".to_string(), v.clone());
        }
        if let Some(v) = &profile.academic.class {
            fields.insert("class".to_string(), v.clone());
        }
        if let Some(v) = &profile.academic.faculty {
            fields.insert("faculty".to_string(), v.clone());
        }
        if let Some(v) = &profile.academic.major {
            fields.insert("major".to_string(), v.clone());
        }
        fields
    }
}

#[async_trait]
impl ToolHandler for FillFormHandler {
    fn tool_type(&self) -> ToolType {
        ToolType::FillForm
    }

    fn validate(&self, arguments: &ToolArgs) -> PortResult<()> {
        if get_str(arguments, "form_type").is_some() {
            Ok(())
        } else {
            Err(PortError::invalid("fill_form requires form_type"))
        }
    }

    async fn execute(&self, arguments: ToolArgs) -> PortResult<ToolOutput> {
        let form_type = get_str_owned(&arguments, "form_type").unwrap();
        let template = template_for(&form_type)
            .ok_or_else(|| PortError::invalid(format!("unknown form_type: {form_type}")))?;

        let mut values: HashMap<String, String> = HashMap::new();
        if let Some(user_id) = get_str(&arguments, "user_context") {
            if let Some(profile) = self.profile_store.get(user_id).await? {
                values.extend(Self::profile_fields(&profile));
            }
        }
        if let Some(additional) = arguments.get("additional_info").and_then(|v| v.as_object()) {
            for (k, v) in additional {
                if let Some(s) = v.as_str() {
                    values.insert(k.clone(), s.to_string());
                }
            }
        }

        let placeholder_re = Regex::new(r"\{(\w+)\}").expect("static regex");
        let mut pre_filled_fields = Vec::new();
        let mut missing_fields = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let form_markdown = placeholder_re
            .replace_all(template, |caps: &regex::Captures| {
                let key = caps[1].to_string();
                if seen.insert(key.clone()) {
                    match values.get(&key) {
                        Some(value) if !value.is_empty() && value != &format!("{{{key}}}") => {
                            pre_filled_fields.push(key.clone());
                        }
                        _ => missing_fields.push(key.clone()),
                    }
                }
                values.get(&key).cloned().unwrap_or_else(|| format!("{{{key}}}"))
            })
            .to_string();

        let mut output = ToolOutput::new();
        output.insert("form_markdown".into(), serde_json::json!(form_markdown));
        output.insert("form_type".into(), serde_json::json!(form_type));
        output.insert("pre_filled_fields".into(), serde_json::json!(pre_filled_fields));
        output.insert("missing_fields".into(), serde_json::json!(missing_fields));
        Ok(output)
    }
}

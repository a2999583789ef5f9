//! `{placeholder}` expansion for output values and command lines.
//!
//! Node descriptors reference their own eventual identity through templates
//! (`{folder}/matches.txt`, `program {allParams}`); this module resolves them
//! against the variable map a node instance builds. `{{` and `}}` escape
//! literal braces.

use std::collections::HashMap;

use crate::errors::TemplateError;

/// Expands every `{name}` in `template` from `vars`.
///
/// Unknown placeholders are an error rather than silently left in place: a
/// half-expanded command line or output path is worse than a refusal.
pub fn expand(template: &str, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(TemplateError::Unclosed {
                                template: template.to_string(),
                            })
                        }
                    }
                }
                match vars.get(&name) {
                    Some(value) => out.push_str(value),
                    None => return Err(TemplateError::UnknownPlaceholder { name }),
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

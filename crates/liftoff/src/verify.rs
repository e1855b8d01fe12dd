//! Verification commands printed after a deploy. Nothing here touches the
//! network.

use std::fmt;

use liftoff_core::Endpoints;

const AUTH_HEADER: &str = r#"-H "Authorization: Bearer $(gcloud auth print-identity-token)""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyCommand {
    pub label: &'static str,
    pub command: String,
}

impl fmt::Display for VerifyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.command)
    }
}

/// Ready-to-run checks against the deployed endpoint at `url`.
///
/// Private services get an identity-token header on every call.
pub fn commands(url: &str, endpoints: &Endpoints, private: bool) -> Vec<VerifyCommand> {
    let base = url.trim_end_matches('/');
    let auth = if private {
        format!("{AUTH_HEADER} ")
    } else {
        String::new()
    };

    vec![
        VerifyCommand {
            label: "health",
            command: format!("curl -fsS {auth}{base}{}", endpoints.health),
        },
        VerifyCommand {
            label: "docs",
            command: format!("curl -fsS {auth}{base}{}", endpoints.docs),
        },
        VerifyCommand {
            label: "invoke",
            command: format!(
                "curl -fsS -X POST {auth}-H \"Content-Type: application/json\" -d {body} {base}{path}",
                body = shell_quote(&endpoints.invoke_body),
                path = endpoints.invoke,
            ),
        },
    ]
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

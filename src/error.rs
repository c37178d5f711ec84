use std::path::PathBuf;

/// Steps of the SSO device authorization workflow, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RegisterClient,
    StartDeviceAuthorization,
    OpenBrowser,
    AwaitConfirmation,
    CreateToken,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::RegisterClient => "registering ssooidc client",
            Step::StartDeviceAuthorization => "starting device authorization",
            Step::OpenBrowser => "opening verification url in browser",
            Step::AwaitConfirmation => "waiting for login confirmation",
            Step::CreateToken => "generating token",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Configuration(String),

    #[error("error while {step} for profile {profile}")]
    Workflow {
        profile: String,
        step: Step,
        #[source]
        source: anyhow::Error,
    },

    #[error("error while calling get-caller-identity with profile {profile}")]
    Identity {
        profile: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("error while writing {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn workflow(profile: &str, step: Step, source: impl Into<anyhow::Error>) -> Self {
        Error::Workflow {
            profile: profile.to_owned(),
            step,
            source: source.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_is_reported_once_in_the_chain() {
        let err = Error::workflow("dev-sso", Step::CreateToken, anyhow::anyhow!("authorization pending"));
        assert_eq!(err.to_string(), "error while generating token for profile dev-sso");

        let chain = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chain, "error while generating token for profile dev-sso: authorization pending");
        assert_eq!(chain.matches("authorization pending").count(), 1);
    }

    #[test]
    fn persistence_error_names_the_path() {
        let err = Error::persistence(
            "/home/me/.aws/.canu",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(err.to_string(), "error while writing /home/me/.aws/.canu");
        assert!(std::error::Error::source(&err).is_some());
    }
}

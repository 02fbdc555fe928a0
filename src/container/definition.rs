use anyhow::{Context, Result};
use nix::unistd::{getgid, getuid};
use tera::Tera;

const TEMPLATE_NAME: &str = "Dockerfile";

const TEMPLATE: &str = r#"FROM {{ base_image }}

RUN apt-get update && apt-get install -y \
    {{ packages | join(sep=" ") }}

COPY {{ binary }} /usr/bin/{{ binary }}
{%- for file in files %}
COPY {{ file }} {{ workdir }}/{{ file }}
{%- endfor %}

RUN echo '{{ user }}:x:{{ uid }}:{{ gid }}:nobody:/:/bin/sh' >> /etc/passwd && \
    chown -R {{ uid }}:{{ gid }} {{ workdir }}

USER {{ user }}
WORKDIR {{ workdir }}
ENTRYPOINT /usr/bin/{{ binary }}
"#;

/// Numeric user and group of the invoking user. The image's build account is
/// created with these so files written through the bind mount are owned by
/// the host user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    pub fn current() -> Self {
        Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerDefinition {
    pub base_image: String,
    pub packages: Vec<String>,
    pub binary: String,
    pub files: Vec<String>,
    pub user: String,
    pub workdir: String,
    pub identity: Identity,
}

impl ContainerDefinition {
    pub fn new(base_image: &str, binary: &str, identity: Identity) -> Self {
        Self {
            base_image: base_image.to_string(),
            packages: vec![],
            binary: binary.to_string(),
            files: vec![],
            user: "builduser".to_string(),
            workdir: "/usr/src".to_string(),
            identity,
        }
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.extend(packages.into_iter().map(Into::into));
        self
    }

    /// Files from the build context copied into the working directory.
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn render(&self) -> Result<String> {
        let mut tera = Tera::default();

        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .context("failed to parse container template")?;

        let mut context = tera::Context::new();
        context.insert("base_image", &self.base_image);
        context.insert("packages", &self.packages);
        context.insert("binary", &self.binary);
        context.insert("files", &self.files);
        context.insert("user", &self.user);
        context.insert("workdir", &self.workdir);
        context.insert("uid", &self.identity.uid);
        context.insert("gid", &self.identity.gid);

        tera.render(TEMPLATE_NAME, &context)
            .context("failed to render container definition")
    }
}

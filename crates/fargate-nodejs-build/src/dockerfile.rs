use crate::bundle::BundlingRequest;

/// Default base image; `NODE_VERSION` is supplied as a build argument.
pub const DEFAULT_BASE_IMAGE: &str = "public.ecr.aws/docker/library/node:${NODE_VERSION}-alpine";

/// Generates the Dockerfile placed next to the bundled output.
pub struct DockerfileGenerator<'a> {
    request: &'a BundlingRequest,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(request: &'a BundlingRequest) -> Self {
        Self { request }
    }

    pub fn render(&self) -> String {
        let base = match &self.request.docker_image {
            Some(image) => image.as_str(),
            None => DEFAULT_BASE_IMAGE,
        };

        format!(
            r#"ARG NODE_VERSION={node_version}
FROM {base}

ENV NODE_ENV=production
ENV HANDLER={handler}
WORKDIR {workdir}

COPY . .

# Modules kept out of the bundle are listed in package.json
RUN if [ -f package.json ]; then npm install --omit=dev && npm cache clean --force; fi

USER node
CMD ["node", "{outfile}"]
"#,
            node_version = self.request.runtime.major(),
            base = base,
            handler = self.request.handler,
            workdir = self.request.working_directory,
            outfile = self.request.outfile_name(),
        )
    }
}

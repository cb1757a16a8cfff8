use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use crate::StackError;
use crate::asset::DockerImageAsset;
use crate::constraints;
use crate::intrinsic;
use crate::resource::Resource;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Handle to a resource declared in a [`Stack`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"Ref": <id>}`
    pub fn reference(&self) -> Value {
        intrinsic::reference(&self.0)
    }

    /// `{"Fn::GetAtt": [<id>, attribute]}`
    pub fn get_att(&self, attribute: &str) -> Value {
        intrinsic::get_att(&self.0, attribute)
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What CloudFormation does with a resource's physical counterpart on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Delete,
    Retain,
}

impl RemovalPolicy {
    fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Retain => "Retain",
        }
    }
}

/// A resource plus its template-level attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub resource: Resource,
    pub depends_on: Vec<LogicalId>,
    pub removal_policy: Option<RemovalPolicy>,
}

#[derive(Debug, Clone, PartialEq)]
struct Output {
    value: Value,
    description: Option<String>,
}

/// An in-memory CloudFormation stack: the declarative resource graph the
/// service composer writes into.
///
/// Resources keep their declaration order. Nothing here talks to AWS; the
/// rendered [`template`](Stack::template) and
/// [`asset_manifest`](Stack::asset_manifest) are handed to the provisioning
/// engine.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: IndexMap<LogicalId, ResourceEntry>,
    assets: IndexMap<String, DockerImageAsset>,
    outputs: IndexMap<String, Output>,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// A placement scope whose logical ids are prefixed with `id`.
    pub fn scope(&mut self, id: &str) -> Result<Scope<'_>, StackError> {
        let prefix = sanitize(id)?;
        Ok(Scope {
            stack: self,
            prefix,
        })
    }

    /// Declare a resource under an exact logical id.
    ///
    /// # Errors
    ///
    /// - [`StackError::InvalidId`] if `logical_id` has no alphanumeric characters
    /// - [`StackError::DuplicateLogicalId`] if the id is already taken
    /// - a provisioning-constraint error if the resource would be rejected on deploy
    pub fn add(
        &mut self,
        logical_id: &str,
        resource: impl Into<Resource>,
    ) -> Result<LogicalId, StackError> {
        let id = LogicalId(sanitize(logical_id)?);
        let resource = resource.into();

        if self.resources.contains_key(&id) {
            return Err(StackError::DuplicateLogicalId(id.0));
        }
        constraints::validate(&resource)?;

        tracing::debug!(logical_id = %id, resource_type = resource.type_name(), "declared resource");
        self.resources.insert(
            id.clone(),
            ResourceEntry {
                resource,
                depends_on: Vec::new(),
                removal_policy: None,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id).map(|e| &e.resource)
    }

    pub fn get_mut(&mut self, id: &LogicalId) -> Option<&mut Resource> {
        self.resources.get_mut(id).map(|e| &mut e.resource)
    }

    pub fn entry(&self, id: &LogicalId) -> Option<&ResourceEntry> {
        self.resources.get(id)
    }

    /// Make `id` depend on `on` (`DependsOn`).
    pub fn add_dependency(&mut self, id: &LogicalId, on: &LogicalId) -> Result<(), StackError> {
        if !self.resources.contains_key(on) {
            return Err(StackError::UnknownResource(on.0.clone()));
        }
        let entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StackError::UnknownResource(id.0.clone()))?;
        if !entry.depends_on.contains(on) {
            entry.depends_on.push(on.clone());
        }
        Ok(())
    }

    pub fn set_removal_policy(
        &mut self,
        id: &LogicalId,
        policy: RemovalPolicy,
    ) -> Result<(), StackError> {
        let entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| StackError::UnknownResource(id.0.clone()))?;
        entry.removal_policy = Some(policy);
        Ok(())
    }

    /// All resources, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter().map(|(id, e)| (id, &e.resource))
    }

    /// Resources of one CloudFormation type, in declaration order.
    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, r)| r.type_name() == type_name)
    }

    pub fn resource_count(&self, type_name: &str) -> usize {
        self.resources_of_type(type_name).count()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Register a docker image asset; registering the same content twice is a no-op.
    pub fn add_docker_image_asset(&mut self, asset: DockerImageAsset) -> Value {
        let uri = asset.image_uri();
        tracing::debug!(hash = %asset.hash, dir = %asset.directory.display(), "registered image asset");
        self.assets.entry(asset.hash.clone()).or_insert(asset);
        uri
    }

    pub fn docker_image_assets(&self) -> impl Iterator<Item = &DockerImageAsset> {
        self.assets.values()
    }

    pub fn add_output(
        &mut self,
        id: &str,
        value: Value,
        description: Option<&str>,
    ) -> Result<(), StackError> {
        let id = sanitize(id)?;
        if self.outputs.contains_key(&id) {
            return Err(StackError::DuplicateLogicalId(id));
        }
        self.outputs.insert(
            id,
            Output {
                value,
                description: description.map(str::to_owned),
            },
        );
        Ok(())
    }

    /// Render the CloudFormation template.
    pub fn template(&self) -> Result<Value, StackError> {
        let mut resources = Map::new();
        for (id, entry) in &self.resources {
            let properties =
                entry
                    .resource
                    .properties()
                    .map_err(|e| StackError::Serialize {
                        logical_id: id.0.clone(),
                        source: e,
                    })?;

            let mut rendered = Map::new();
            rendered.insert("Type".to_owned(), json!(entry.resource.type_name()));
            rendered.insert("Properties".to_owned(), properties);
            if !entry.depends_on.is_empty() {
                let deps: Vec<&str> = entry.depends_on.iter().map(LogicalId::as_str).collect();
                rendered.insert("DependsOn".to_owned(), json!(deps));
            }
            if let Some(policy) = entry.removal_policy {
                rendered.insert("DeletionPolicy".to_owned(), json!(policy.as_str()));
                rendered.insert("UpdateReplacePolicy".to_owned(), json!(policy.as_str()));
            }
            resources.insert(id.0.clone(), Value::Object(rendered));
        }

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_owned(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = &self.description {
            template.insert("Description".to_owned(), json!(description));
        }
        template.insert("Resources".to_owned(), Value::Object(resources));

        if !self.outputs.is_empty() {
            let mut outputs = Map::new();
            for (id, output) in &self.outputs {
                let mut rendered = Map::new();
                rendered.insert("Value".to_owned(), output.value.clone());
                if let Some(description) = &output.description {
                    rendered.insert("Description".to_owned(), json!(description));
                }
                outputs.insert(id.clone(), Value::Object(rendered));
            }
            template.insert("Outputs".to_owned(), Value::Object(outputs));
        }

        Ok(Value::Object(template))
    }

    /// Render the asset manifest listing every image to build and publish.
    pub fn asset_manifest(&self) -> Value {
        let images: Map<String, Value> = self
            .assets
            .values()
            .map(|a| (a.hash.clone(), a.manifest_entry()))
            .collect();
        json!({
            "version": "1",
            "dockerImages": images,
        })
    }
}

/// A path-prefixed view of a [`Stack`].
///
/// Logical ids declared through a scope are the scope prefix followed by
/// the local id, with non-alphanumeric characters removed.
pub struct Scope<'a> {
    stack: &'a mut Stack,
    prefix: String,
}

impl Scope<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Logical id a local `id` maps to in this scope.
    pub fn logical_id(&self, id: &str) -> Result<String, StackError> {
        Ok(format!("{}{}", self.prefix, sanitize(id)?))
    }

    pub fn add(&mut self, id: &str, resource: impl Into<Resource>) -> Result<LogicalId, StackError> {
        let logical_id = self.logical_id(id)?;
        self.stack.add(&logical_id, resource)
    }

    pub fn stack(&mut self) -> &mut Stack {
        self.stack
    }
}

fn sanitize(id: &str) -> Result<String, StackError> {
    let clean: String = id.chars().filter(char::is_ascii_alphanumeric).collect();
    if clean.is_empty() {
        return Err(StackError::InvalidId(id.to_owned()));
    }
    Ok(clean)
}

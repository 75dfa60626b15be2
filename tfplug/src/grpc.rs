//! gRPC service implementation for ProviderV2
//!
//! Implements the subset of Terraform Plugin Protocol v6 the framework
//! supports. Resources are created on demand through the provider factory,
//! so the provider lock is held only while a resource instance is built.

use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::proto::{self, attribute_path::step::Selector, diagnostic::Severity};
use crate::provider::{ProviderV2, ResourceV2};
use crate::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportRequest, ReadRequest, UpdateRequest,
};
use crate::schema::{Attribute, AttributeType, Schema, StringKind};
use crate::types::{AttributePath, Diagnostics, Dynamic, Values};
use crate::TfplugError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, warn};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct ProviderService<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
        }
    }

    async fn resource_schema(&self, type_name: &str) -> Option<Schema> {
        let provider = self.provider.read().await;
        provider.resource_schemas().await.remove(type_name)
    }

    /// Builds a resource instance or explains in diagnostics why it cannot
    async fn resource(
        &self,
        type_name: &str,
        diags: &mut Diagnostics,
    ) -> Option<Box<dyn ResourceV2>> {
        let provider = self.provider.read().await;
        match provider.create_resource(type_name).await {
            Ok(resource) => Some(resource),
            Err(e) => {
                warn!(type_name, error = %e, "unable to create resource instance");
                diags.add_error(e.to_string(), None::<String>);
                None
            }
        }
    }
}

#[tonic::async_trait]
impl<P: ProviderV2 + 'static> proto::ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let provider = self.provider.read().await;
        let mut resources: Vec<String> = provider.resource_schemas().await.into_keys().collect();
        resources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: vec![],
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let provider = self.provider.read().await;
        let resource_schemas = provider
            .resource_schemas()
            .await
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider.schema())),
            resource_schemas,
            data_source_schemas: HashMap::new(),
            diagnostics: vec![],
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let req = request.into_inner();
        let config = decode_values(req.config.as_ref())?.unwrap_or_default();
        let schema = self.provider.read().await.schema();

        let diagnostics = validate_values(&config, &schema.block.attributes);
        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: encode_diagnostics(&diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let req = request.into_inner();

        let mut diags = Diagnostics::new();
        match self.resource_schema(&req.type_name).await {
            Some(schema) => {
                let config = decode_values(req.config.as_ref())?.unwrap_or_default();
                diags.extend(validate_values(&config, &schema.block.attributes));
            }
            None => diags.add_error(
                format!("Unknown resource type: {}", req.type_name),
                None::<String>,
            ),
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: encode_diagnostics(&diags),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let req = request.into_inner();
        let schema = self
            .resource_schema(&req.type_name)
            .await
            .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", req.type_name)))?;

        let mut diags = Diagnostics::new();
        if req.version > schema.version {
            diags.add_error(
                "Unable to upgrade resource state",
                Some(format!(
                    "state version {} is newer than schema version {}",
                    req.version, schema.version
                )),
            );
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: encode_diagnostics(&diags),
            }));
        }

        let raw = req.raw_state.map(|raw| raw.json).unwrap_or_default();
        let upgraded_state = if raw.is_empty() {
            None
        } else {
            let values: HashMap<String, Dynamic> = serde_json::from_slice(&raw).map_err(|e| {
                error!(type_name = %req.type_name, error = %e, "failed to decode raw state");
                TfplugError::DecodingError(format!("raw state: {}", e))
            })?;
            let values = conform_to_schema(Values::from(values), &schema.block.attributes);
            Some(encode_values(&values)?)
        };

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state,
            diagnostics: encode_diagnostics(&diags),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let req = request.into_inner();
        let config = decode_values(req.config.as_ref())?.unwrap_or_default();

        debug!(
            attributes = ?config.values.keys().collect::<Vec<_>>(),
            "configure_provider called"
        );

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                terraform_version: req.terraform_version,
                config,
            })
            .await;

        if response.diagnostics.has_errors() {
            warn!("provider configuration failed");
        } else {
            info!("provider configured");
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: encode_diagnostics(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let req = request.into_inner();
        let mut diags = Diagnostics::new();

        let current_state = match decode_values(req.current_state.as_ref())? {
            Some(state) => state,
            None => {
                return Ok(Response::new(proto::read_resource::Response {
                    new_state: Some(encode_null()?),
                    diagnostics: vec![],
                    private: req.private,
                }))
            }
        };

        let (schema, resource) = match self.schema_and_resource(&req.type_name, &mut diags).await {
            Some(found) => found,
            None => {
                return Ok(Response::new(proto::read_resource::Response {
                    new_state: req.current_state,
                    diagnostics: encode_diagnostics(&diags),
                    private: req.private,
                }))
            }
        };

        let response = resource
            .read(ReadRequest {
                current_state: current_state.clone(),
            })
            .await;
        diags.extend(response.diagnostics);

        let new_state = match response.state {
            Some(state) => encode_values(&conform_to_schema(state, &schema.block.attributes))?,
            None if diags.has_errors() => encode_values(&current_state)?,
            None => {
                debug!(type_name = %req.type_name, "resource no longer exists");
                encode_null()?
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(new_state),
            diagnostics: encode_diagnostics(&diags),
            private: req.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let req = request.into_inner();
        let schema = self
            .resource_schema(&req.type_name)
            .await
            .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", req.type_name)))?;

        let prior_state = decode_values(req.prior_state.as_ref())?;
        let config = decode_values(req.config.as_ref())?.unwrap_or_default();

        // destroy plans are passed through untouched
        let Some(proposed) = decode_values(req.proposed_new_state.as_ref())? else {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: req.proposed_new_state,
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
            }));
        };

        let plan = plan_change(&schema, prior_state.as_ref(), proposed, &config);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_values(&plan.planned_state)?),
            requires_replace: plan.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: encode_diagnostics(&plan.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let req = request.into_inner();
        let mut diags = Diagnostics::new();

        let prior_state = decode_values(req.prior_state.as_ref())?;
        let planned_state = decode_values(req.planned_state.as_ref())?;
        let config = decode_values(req.config.as_ref())?.unwrap_or_default();

        let Some((schema, resource)) = self.schema_and_resource(&req.type_name, &mut diags).await
        else {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: req.prior_state,
                private: vec![],
                diagnostics: encode_diagnostics(&diags),
                legacy_type_system: false,
            }));
        };

        let new_state = match (prior_state, planned_state) {
            (Some(current_state), None) => {
                info!(type_name = %req.type_name, "deleting resource");
                let response = resource
                    .delete(DeleteRequest {
                        current_state: current_state.clone(),
                    })
                    .await;
                diags.extend(response.diagnostics);
                diags.has_errors().then_some(current_state)
            }
            (None, Some(planned_state)) => {
                info!(type_name = %req.type_name, "creating resource");
                let response = resource
                    .create(CreateRequest {
                        config,
                        planned_state,
                    })
                    .await;
                diags.extend(response.diagnostics);
                (!diags.has_errors()).then_some(response.state)
            }
            (Some(current_state), Some(planned_state)) => {
                info!(type_name = %req.type_name, "updating resource");
                let response = resource
                    .update(UpdateRequest {
                        config,
                        planned_state,
                        current_state: current_state.clone(),
                    })
                    .await;
                diags.extend(response.diagnostics);
                Some(if diags.has_errors() {
                    current_state
                } else {
                    response.state
                })
            }
            (None, None) => None,
        };

        let new_state = match new_state {
            Some(state) => {
                let state = conform_to_schema(state, &schema.block.attributes);
                encode_values(&resolve_unknowns(state))?
            }
            None => encode_null()?,
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(new_state),
            private: vec![],
            diagnostics: encode_diagnostics(&diags),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let req = request.into_inner();
        let mut diags = Diagnostics::new();
        let mut imported_resources = Vec::new();

        if let Some((schema, resource)) = self.schema_and_resource(&req.type_name, &mut diags).await
        {
            info!(type_name = %req.type_name, id = %req.id, "importing resource");
            let response = resource.import_state(ImportRequest { id: req.id }).await;
            diags.extend(response.diagnostics);

            match response.state {
                Some(state) => {
                    let state = conform_to_schema(state, &schema.block.attributes);
                    imported_resources.push(proto::import_resource_state::ImportedResource {
                        type_name: req.type_name,
                        state: Some(encode_values(&resolve_unknowns(state))?),
                        private: vec![],
                    });
                }
                None if !diags.has_errors() => diags.add_error(
                    "Cannot import non-existent remote object",
                    Some("The remote object does not exist or was deleted"),
                ),
                None => {}
            }
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: encode_diagnostics(&diags),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        info!("stop requested");
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    async fn schema_and_resource(
        &self,
        type_name: &str,
        diags: &mut Diagnostics,
    ) -> Option<(Schema, Box<dyn ResourceV2>)> {
        let resource = self.resource(type_name, diags).await?;
        Some((resource.schema(), resource))
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

pub(crate) struct PlannedChange {
    pub planned_state: Values,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Diagnostics,
}

/// Computes the planned state for a create or update.
///
/// Computed attributes left null in configuration become unknown whenever
/// the resource changes; plan modifiers then run against the prior state.
pub(crate) fn plan_change(
    schema: &Schema,
    prior_state: Option<&Values>,
    proposed: Values,
    config: &Values,
) -> PlannedChange {
    let mut planned_state = conform_to_schema(proposed, &schema.block.attributes);
    let mut requires_replace = Vec::new();
    let mut diagnostics = Diagnostics::new();

    let changed = match prior_state {
        None => true,
        Some(prior) => {
            let prior = conform_to_schema(prior.clone(), &schema.block.attributes);
            !values_equal(
                &Dynamic::Map(prior.values),
                &Dynamic::Map(planned_state.values.clone()),
            )
        }
    };

    if changed {
        for attr in schema.block.attributes.iter().filter(|a| a.computed) {
            let configured = config.get(&attr.name).is_some_and(|v| !v.is_null());
            if !configured {
                planned_state.insert(attr.name.clone(), Dynamic::Unknown);
            }
        }
    }

    for attr in &schema.block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let state_value = prior_state
            .and_then(|s| s.get(&attr.name).cloned())
            .unwrap_or(Dynamic::Null);
        let config_value = config.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
        let mut plan_value = planned_state
            .get(&attr.name)
            .cloned()
            .unwrap_or(Dynamic::Null);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify_plan(PlanModifyRequest {
                state: state_value.clone(),
                plan: plan_value,
                config: config_value.clone(),
                path: AttributePath::new(&attr.name),
            });

            plan_value = response.plan_value;
            if response.requires_replace && prior_state.is_some() {
                debug!(attribute = %attr.name, "change requires replacement");
                requires_replace.push(AttributePath::new(&attr.name));
            }
            diagnostics.extend(response.diagnostics);
        }

        planned_state.insert(attr.name.clone(), plan_value);
    }

    requires_replace.dedup();
    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

/// Checks configuration against attribute definitions, recursing into
/// single nested objects.
pub(crate) fn validate_values(config: &Values, attributes: &[Attribute]) -> Diagnostics {
    let mut diags = Diagnostics::new();
    validate_object(&config.values, attributes, None, &mut diags);
    diags
}

fn validate_object(
    values: &HashMap<String, Dynamic>,
    attributes: &[Attribute],
    parent: Option<&AttributePath>,
    diags: &mut Diagnostics,
) {
    let path_for = |name: &str| match parent {
        Some(parent) => parent.clone().attribute(name),
        None => AttributePath::new(name),
    };

    for attr in attributes {
        let path = path_for(&attr.name);
        let value = values.get(&attr.name).unwrap_or(&Dynamic::Null);

        match value {
            Dynamic::Unknown => continue,
            Dynamic::Null if attr.required => diags.add_attribute_error(
                path.clone(),
                "Missing required argument",
                format!("The argument \"{}\" is required, but no definition was found.", path),
            ),
            Dynamic::Null => {}
            _ if attr.computed && !attr.optional && !attr.required => diags.add_attribute_error(
                path.clone(),
                "Invalid configuration for computed attribute",
                format!("\"{}\" is computed by the provider and cannot be set.", path),
            ),
            _ if !conforms(value, &attr.value_type()) => diags.add_attribute_error(
                path.clone(),
                "Incorrect attribute value type",
                format!(
                    "\"{}\" expects {}, got {}",
                    path,
                    attr.value_type().to_type_json(),
                    value.type_name()
                ),
            ),
            Dynamic::Map(nested_values) => {
                if let Some(nested) = &attr.nested_type {
                    validate_object(nested_values, &nested.attributes, Some(&path), diags);
                }
            }
            _ => {}
        }
    }

    for name in values.keys() {
        if !attributes.iter().any(|a| &a.name == name) {
            diags.add_attribute_error(
                path_for(name),
                "Unsupported argument",
                format!("An argument named \"{}\" is not expected here.", name),
            );
        }
    }
}

fn conforms(value: &Dynamic, ty: &AttributeType) -> bool {
    match (value, ty) {
        (Dynamic::Null | Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String)
        | (Dynamic::Number(_), AttributeType::Number)
        | (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(items), AttributeType::List(elem)) => {
            items.iter().all(|item| conforms(item, elem))
        }
        (Dynamic::Map(entries), AttributeType::Map(elem)) => {
            entries.values().all(|entry| conforms(entry, elem))
        }
        (Dynamic::Map(entries), AttributeType::Object(fields)) => entries
            .iter()
            .all(|(k, v)| fields.get(k).is_some_and(|field| conforms(v, field))),
        _ => false,
    }
}

/// Shapes values into exactly the attributes the schema declares: missing
/// attributes become null and undeclared ones are dropped.
pub(crate) fn conform_to_schema(values: Values, attributes: &[Attribute]) -> Values {
    Values::from(conform_object(values.values, attributes))
}

fn conform_object(
    mut values: HashMap<String, Dynamic>,
    attributes: &[Attribute],
) -> HashMap<String, Dynamic> {
    attributes
        .iter()
        .map(|attr| {
            let value = values.remove(&attr.name).unwrap_or(Dynamic::Null);
            let value = match (value, &attr.nested_type) {
                (Dynamic::Map(nested_values), Some(nested)) => {
                    Dynamic::Map(conform_object(nested_values, &nested.attributes))
                }
                (value, _) => value,
            };
            (attr.name.clone(), value)
        })
        .collect()
}

/// Applied states must be wholly known; leftover unknowns are stored as null.
fn resolve_unknowns(values: Values) -> Values {
    fn resolve(value: Dynamic) -> Dynamic {
        match value {
            Dynamic::Unknown => Dynamic::Null,
            Dynamic::List(items) => Dynamic::List(items.into_iter().map(resolve).collect()),
            Dynamic::Map(entries) => {
                Dynamic::Map(entries.into_iter().map(|(k, v)| (k, resolve(v))).collect())
            }
            other => other,
        }
    }

    Values::from(
        values
            .values
            .into_iter()
            .map(|(k, v)| (k, resolve(v)))
            .collect::<HashMap<_, _>>(),
    )
}

/// Decodes a top-level object. Absent, empty and null values decode to `None`.
pub(crate) fn decode_values(
    value: Option<&proto::DynamicValue>,
) -> crate::Result<Option<Values>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let decoded: Dynamic = if !value.msgpack.is_empty() {
        rmp_serde::from_slice(&value.msgpack).map_err(|e| {
            let preview = &value.msgpack[..value.msgpack.len().min(32)];
            error!(error = %e, ?preview, "failed to decode msgpack value");
            TfplugError::DecodingError(format!("msgpack: {}", e))
        })?
    } else if !value.json.is_empty() {
        serde_json::from_slice(&value.json)
            .map_err(|e| TfplugError::DecodingError(format!("json: {}", e)))?
    } else {
        return Ok(None);
    };

    match decoded {
        Dynamic::Null => Ok(None),
        Dynamic::Map(values) => Ok(Some(Values::from(values))),
        other => Err(TfplugError::TypeMismatch {
            expected: "object".to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

pub(crate) fn encode_values(values: &Values) -> crate::Result<proto::DynamicValue> {
    let msgpack = rmp_serde::to_vec_named(&values.values)
        .map_err(|e| TfplugError::EncodingError(format!("msgpack: {}", e)))?;

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn encode_null() -> crate::Result<proto::DynamicValue> {
    let msgpack = rmp_serde::to_vec(&Dynamic::Null)
        .map_err(|e| TfplugError::EncodingError(format!("msgpack: {}", e)))?;

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema.block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    let (r#type, nested_type) = match &attr.nested_type {
        Some(nested) => (
            vec![],
            Some(proto::schema::Object {
                attributes: nested.attributes.iter().map(attribute_to_proto).collect(),
                nesting: proto::schema::object::NestingMode::Single as i32,
            }),
        ),
        None => (attr.r#type.to_type_json().to_string().into_bytes(), None),
    };

    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type,
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: string_kind(StringKind::Plain),
        deprecated: attr.deprecated,
    }
}

fn string_kind(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|name| proto::attribute_path::Step {
                selector: Some(Selector::AttributeName(name.clone())),
            })
            .collect(),
    }
}

fn encode_diagnostics(diags: &Diagnostics) -> Vec<proto::Diagnostic> {
    let encode = |severity: Severity, diag: &crate::types::Diagnostic| proto::Diagnostic {
        severity: severity as i32,
        summary: diag.summary.clone(),
        detail: diag.detail.clone().unwrap_or_default(),
        attribute: diag.attribute.as_ref().map(path_to_proto),
    };

    diags
        .errors
        .iter()
        .map(|d| encode(Severity::Error, d))
        .chain(diags.warnings.iter().map(|d| encode(Severity::Warning, d)))
        .collect()
}

use anyhow::{Context, Result};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, update};
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SpannerSettings;
use crate::endpoint::{EndpointDefinition, EndpointInput, FieldError, Params, Verb};
use crate::store::StoreError;

const TABLE: &str = "endpoints";
const UNIQUE_INDEX: &str = "endpoints_by_verb_pattern";

const SELECT_COLUMNS: &str = "SELECT id, verb, pattern, response, status, params FROM endpoints";

/// Endpoint store backed by Cloud Spanner.
///
/// The (verb, pattern) uniqueness rule is enforced by a unique index, so a
/// losing concurrent writer is rejected by Spanner itself.
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
}

impl SpannerStore {
    /// Connect to Spanner, provisioning the instance, database, table and
    /// index first if they do not exist.
    ///
    /// `ClientConfig::default()` picks up SPANNER_EMULATOR_HOST, so the same
    /// code path serves the emulator and production.
    pub async fn from_settings(settings: &SpannerSettings) -> Result<Self> {
        auto_provision(settings).await?;

        let database_path = settings.database_path();

        match &settings.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    /// All definitions ordered by creation time, then id
    pub async fn list(&self) -> Result<Vec<EndpointDefinition>, StoreError> {
        let statement = Statement::new(&format!("{} ORDER BY created_at ASC, id ASC", SELECT_COLUMNS));

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to list endpoints from Spanner")?;

        let mut definitions = Vec::new();
        while let Some(row) = result_set.next().await.context("Failed to read endpoint row")? {
            definitions.push(definition_from_row(&row)?);
        }

        tracing::debug!("Listed {} endpoints", definitions.len());
        Ok(definitions)
    }

    pub async fn get(&self, id: &str) -> Result<EndpointDefinition, StoreError> {
        let mut statement = Statement::new(&format!("{} WHERE id = @id", SELECT_COLUMNS));
        statement.add_param("id", &id.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query endpoint from Spanner")?;

        match result_set.next().await.context("Failed to read endpoint row")? {
            Some(row) => {
                tracing::debug!("Read endpoint with id: {}", id);
                Ok(definition_from_row(&row)?)
            }
            None => {
                tracing::debug!("Endpoint not found with id: {}", id);
                Err(StoreError::NotFound(id.to_string()))
            }
        }
    }

    pub async fn create(&self, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        let fields = input.normalize().for_create().map_err(StoreError::Validation)?;
        let definition = fields.into_definition(Uuid::new_v4().to_string());

        let verb = definition.verb.to_string();
        let status = i64::from(definition.status);
        let params = serde_json::to_string(&definition.params)
            .context("Failed to serialize endpoint params")?;

        let mutation = insert(
            TABLE,
            &["id", "verb", "pattern", "response", "status", "params", "created_at", "updated_at"],
            &[
                &definition.id,
                &verb,
                &definition.pattern,
                &definition.response,
                &status,
                &params,
                &CommitTimestamp::new(),
                &CommitTimestamp::new(),
            ],
        );

        if let Err(err) = self.inner.apply(vec![mutation]).await {
            return Err(write_error(err, &definition));
        }

        tracing::debug!("Inserted endpoint {} {} with id: {}", definition.verb, definition.pattern, definition.id);
        Ok(definition)
    }

    /// Merge `input` over the stored row and write it back.
    ///
    /// A concurrent delete between the read and the write surfaces as
    /// `NotFound`; a concurrent writer taking the same key surfaces as the
    /// duplicate validation error.
    pub async fn update(&self, id: &str, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        let existing = self.get(id).await?;
        let fields = input
            .normalize()
            .merge_into(&existing)
            .map_err(StoreError::Validation)?;
        let definition = fields.into_definition(existing.id);

        let verb = definition.verb.to_string();
        let status = i64::from(definition.status);
        let params = serde_json::to_string(&definition.params)
            .context("Failed to serialize endpoint params")?;

        let mutation = update(
            TABLE,
            &["id", "verb", "pattern", "response", "status", "params", "updated_at"],
            &[
                &definition.id,
                &verb,
                &definition.pattern,
                &definition.response,
                &status,
                &params,
                &CommitTimestamp::new(),
            ],
        );

        if let Err(err) = self.inner.apply(vec![mutation]).await {
            return Err(write_error(err, &definition));
        }

        tracing::debug!("Updated endpoint with id: {}", id);
        Ok(definition)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        // Delete mutations succeed on missing keys, so check first
        self.get(id).await?;

        let mutation = delete(TABLE, Key::new(&id.to_string()));
        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to delete endpoint from Spanner")?;

        tracing::debug!("Deleted endpoint with id: {}", id);
        Ok(())
    }

    /// Perform a health check by executing a simple query
    pub async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

fn definition_from_row(row: &Row) -> Result<EndpointDefinition> {
    let id: String = row.column_by_name("id")?;
    let verb: String = row.column_by_name("verb")?;
    let pattern: String = row.column_by_name("pattern")?;
    let response: String = row.column_by_name("response")?;
    let status: i64 = row.column_by_name("status")?;
    let params: String = row.column_by_name("params")?;

    let verb = verb
        .parse::<Verb>()
        .map_err(|_| anyhow::anyhow!("Stored endpoint {} has unknown verb '{}'", id, verb))?;
    let status = u16::try_from(status)
        .with_context(|| format!("Stored endpoint {} has invalid status {}", id, status))?;
    let params: Params = serde_json::from_str(&params)
        .with_context(|| format!("Failed to deserialize params of endpoint {}", id))?;

    Ok(EndpointDefinition {
        id,
        verb,
        pattern,
        response,
        status,
        params,
    })
}

/// Map a failed commit onto the store's error taxonomy
fn write_error(err: SpannerError, definition: &EndpointDefinition) -> StoreError {
    match &err {
        SpannerError::GRPC(status) if status.code() == Code::AlreadyExists => {
            tracing::info!(
                "Spanner rejected duplicate {} {}: {}",
                definition.verb,
                definition.pattern,
                status.message()
            );
            StoreError::Validation(vec![FieldError::duplicate(definition.verb, &definition.pattern)])
        }
        SpannerError::GRPC(status) if status.code() == Code::NotFound => {
            StoreError::NotFound(definition.id.clone())
        }
        _ => StoreError::Backend(anyhow::Error::new(err).context("Failed to write endpoint to Spanner")),
    }
}

/// Automatically provision Spanner instance, database, table and index
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(settings: &SpannerSettings) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", settings.project);
    let instance_path = format!("{}/instances/{}", project_path, settings.instance);
    let database_path = settings.database_path();

    ensure_instance_exists(&admin_client, settings, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    settings: &SpannerSettings,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if settings.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: settings.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", settings.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

fn endpoints_ddl() -> Vec<String> {
    let table = r#"
CREATE TABLE endpoints (
    id STRING(36) NOT NULL,
    verb STRING(8) NOT NULL,
    pattern STRING(MAX) NOT NULL,
    response STRING(MAX) NOT NULL,
    status INT64 NOT NULL,
    params STRING(MAX) NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#
    .trim()
    .to_string();

    let index = format!("CREATE UNIQUE INDEX {} ON {} (verb, pattern)", UNIQUE_INDEX, TABLE);

    vec![table, index]
}

/// Ensure the endpoints table and its unique index exist
async fn ensure_table_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.contains("CREATE TABLE endpoints") || stmt.contains("CREATE TABLE `endpoints`"));

    if table_exists {
        tracing::info!("Table '{}' already exists", TABLE);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating with unique index '{}'...", TABLE, UNIQUE_INDEX);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: endpoints_ddl(),
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", TABLE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;

    fn emulator_settings(instance: &str, database: &str) -> SpannerSettings {
        SpannerSettings {
            emulator_host: Some("localhost:9010".to_string()),
            project: "test-project".to_string(),
            instance: instance.to_string(),
            database: database.to_string(),
        }
    }

    /// Connect to the local emulator, or `None` if it is not running
    async fn connect(instance: &str, database: &str) -> Option<SpannerStore> {
        unsafe {
            std::env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
        }
        let result = SpannerStore::from_settings(&emulator_settings(instance, database)).await;
        unsafe {
            std::env::remove_var("SPANNER_EMULATOR_HOST");
        }

        match result {
            Ok(store) => Some(store),
            Err(e) => {
                println!("Spanner test skipped (emulator may not be running): {}", e);
                None
            }
        }
    }

    fn input(verb: &str, pattern: &str, response: &str) -> EndpointInput {
        EndpointInput {
            verb: Some(verb.to_string()),
            pattern: Some(pattern.to_string()),
            response: Some(response.to_string()),
            ..Default::default()
        }
    }

    fn unique_pattern(prefix: &str) -> String {
        format!("/{}/{}", prefix, Uuid::new_v4())
    }

    #[test]
    fn test_store_is_clonable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SpannerStore>();
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpannerStore>();
    }

    #[test]
    fn test_ddl_declares_unique_verb_pattern_index() {
        let ddl = endpoints_ddl();
        assert_eq!(ddl.len(), 2);
        assert!(ddl[0].starts_with("CREATE TABLE endpoints"));
        assert!(ddl[0].contains("PRIMARY KEY (id)"));
        assert_eq!(
            ddl[1],
            "CREATE UNIQUE INDEX endpoints_by_verb_pattern ON endpoints (verb, pattern)"
        );
    }

    #[tokio::test]
    async fn test_client_creation_error_has_context() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
        }
        let result = SpannerStore::from_settings(&emulator_settings("test-instance", "test-database")).await;
        unsafe {
            std::env::remove_var("SPANNER_EMULATOR_HOST");
        }

        if let Err(e) = result {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains("Failed to create Spanner")
                    || error_msg.contains("Failed to start")
                    || error_msg.contains("Failed to check")
                    || error_msg.contains("Failed to get"),
                "Error should have context: {}",
                error_msg
            );
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let Some(store) = connect("crud-test-instance", "crud-test-db").await else {
            return;
        };

        let pattern = unique_pattern("crud");
        let mut raw = input("get", &pattern, "pong");
        raw.params_key = vec!["b".to_string(), "a".to_string()];
        raw.params_value = vec!["2".to_string(), "1".to_string()];

        let created = store.create(&raw).await.unwrap();
        assert_eq!(created.status, 200);
        assert_eq!(store.get(&created.id).await.unwrap(), created);

        let patch = EndpointInput {
            response: Some("changed".to_string()),
            ..Default::default()
        };
        let updated = store.update(&created.id, &patch).await.unwrap();
        assert_eq!(updated.response, "changed");
        assert_eq!(updated.pattern, pattern);
        assert_eq!(updated.params, created.params);

        store.delete(&created.id).await.unwrap();
        assert!(matches!(store.get(&created.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&created.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let Some(store) = connect("dup-test-instance", "dup-test-db").await else {
            return;
        };

        let pattern = unique_pattern("dup");
        let x = input("POST", &pattern, "x");
        let y = input("POST", &pattern, "y");
        let (first, second) = tokio::join!(store.create(&x), store.create(&y));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|r| matches!(r, Err(e) if e.is_duplicate())).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_creation() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let Some(store) = connect("list-test-instance", "list-test-db").await else {
            return;
        };

        let first = store.create(&input("GET", &unique_pattern("order"), "1")).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        let second = store.create(&input("GET", &unique_pattern("order"), "2")).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.id).collect();
        let first_pos = ids.iter().position(|id| *id == first.id).unwrap();
        let second_pos = ids.iter().position(|id| *id == second.id).unwrap();
        assert!(first_pos < second_pos);
    }
}

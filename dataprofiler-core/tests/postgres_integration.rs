//! PostgreSQL integration tests using testcontainers.
//!
//! These start a real PostgreSQL server and require Docker; they are
//! ignored by default. Run with `cargo test -- --ignored`.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

#[cfg(feature = "postgresql")]
mod postgres_integration {
    use dataprofiler_core::{
        BackendKind, ConnectionSpec, CredentialStore, DatabaseConnector, DriverRegistry,
        LogicalType, MemoryStore, MetricValue, Profiler, ProfilerError, Value,
    };
    use std::sync::Arc;
    use testcontainers_modules::postgres::Postgres;
    use testcontainers_modules::testcontainers::ContainerAsync;
    use testcontainers_modules::testcontainers::runners::AsyncRunner;
    use zeroize::Zeroizing;

    const SEED: &str = r"
        CREATE TABLE fruit (
            id INTEGER PRIMARY KEY,
            name VARCHAR(32),
            price NUMERIC(6, 2),
            picked DATE,
            organic BOOLEAN
        );
        INSERT INTO fruit VALUES
            (1, 'apple', 1.20, '2023-01-01', true),
            (2, 'banana', 0.50, '2023-01-03', false),
            (3, 'orange', NULL, '2023-01-02', NULL);
        CREATE TABLE empty_table (id INTEGER, label TEXT);
    ";

    async fn start() -> (ContainerAsync<Postgres>, ConnectionSpec) {
        let container = Postgres::default()
            .start()
            .await
            .expect("Failed to start PostgreSQL container");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        let spec = ConnectionSpec::new(BackendKind::Postgres, "127.0.0.1", port, "postgres", "postgres");
        (container, spec)
    }

    async fn seeded_connector(spec: &ConnectionSpec) -> DatabaseConnector {
        let driver = DriverRegistry::with_defaults()
            .driver(BackendKind::Postgres)
            .unwrap();
        let mut connector = DatabaseConnector::new(spec.clone(), "postgres", driver);
        connector.connect().await.expect("Failed to connect");

        for statement in SEED.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            connector.execute(statement).await.expect("Failed to seed");
        }
        connector
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_postgres_execute_decodes_cells() {
        let (_container, spec) = start().await;
        let mut connector = seeded_connector(&spec).await;

        let rows = connector
            .execute("SELECT id, name, price, organic FROM fruit ORDER BY id")
            .await
            .unwrap();
        assert_eq!(rows.columns, ["id", "name", "price", "organic"]);
        assert_eq!(rows.rows[0][0], Value::Integer(1));
        assert_eq!(rows.rows[0][1], Value::Text("apple".to_string()));
        assert_eq!(rows.rows[0][2], Value::Float(1.2));
        assert_eq!(rows.rows[0][3], Value::Boolean(true));
        assert_eq!(rows.rows[2][2], Value::Null);

        let empty = connector.execute("SELECT * FROM empty_table").await.unwrap();
        assert_eq!(empty.columns, ["id", "label"]);
        assert_eq!(empty.row_count(), 0);

        let bad = connector.execute("SELEC nonsense").await;
        assert!(matches!(bad, Err(ProfilerError::QueryExecution { .. })));

        connector.close().await;
        connector.close().await;
        assert!(!connector.is_connected());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_postgres_wrong_password_is_connection_error() {
        let (_container, spec) = start().await;
        let driver = DriverRegistry::with_defaults()
            .driver(BackendKind::Postgres)
            .unwrap();
        let mut connector = DatabaseConnector::new(spec, "not-the-password", driver);

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, ProfilerError::Connection { .. }));
        assert!(!err.to_string().contains("not-the-password"));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_postgres_table_profiling_end_to_end() {
        let (_container, spec) = start().await;
        let mut seeding = seeded_connector(&spec).await;
        seeding.close().await;

        let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
        credentials.store(&spec, "postgres").await.unwrap();

        let log = Arc::new(MemoryStore::new());
        let profiler = Profiler::new(log.clone());
        let source = || Ok(Zeroizing::new("postgres".to_string()));

        let run = profiler
            .profile_database(
                &credentials,
                BackendKind::Postgres,
                "public.fruit",
                &source,
                &DriverRegistry::with_defaults(),
            )
            .await
            .unwrap();

        let by_name = |name: &str| {
            run.records
                .iter()
                .find(|r| r.column_name == name)
                .unwrap()
        };

        assert_eq!(run.records.len(), 5);
        assert_eq!(by_name("id").column_type, LogicalType::Number);
        assert_eq!(
            by_name("id").descriptive_stats.get("max"),
            Some(&MetricValue::Integer(3))
        );
        assert_eq!(by_name("name").column_type, LogicalType::String);
        assert_eq!(by_name("price").column_type, LogicalType::Number);
        assert_eq!(by_name("picked").column_type, LogicalType::DateTime);
        assert_eq!(by_name("organic").column_type, LogicalType::Unknown);
        assert!(by_name("organic").descriptive_stats.is_empty());

        for record in &run.records {
            assert_eq!(record.table_name.as_deref(), Some("public.fruit"));
            assert_eq!(record.record_count, 3);
            assert_eq!(record.size, None);
        }
    }
}

//! Attribute set generators.
//!
//! The generated spans model a Java service issuing a MySQL query, so the
//! item attributes follow the OpenTelemetry database client conventions and
//! the resource attributes describe the Kubernetes pod the service runs in.

use rand::Rng;
use serde_json::json;
use span_record::AttributeMap;

/// Item-level attributes of a database client span.
///
/// `thread.id` is the only randomized value so payloads are not byte-identical.
pub fn db_client_attributes<R: Rng>(rng: &mut R) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    attributes.insert("db.name".to_string(), json!("productservice"));
    attributes.insert("db.user".to_string(), json!("service_user"));
    attributes.insert("db.system".to_string(), json!("mysql"));
    attributes.insert("thread.id".to_string(), json!(rng.gen_range(1..=64)));
    attributes.insert("thread.name".to_string(), json!("main"));
    attributes.insert("db.operation".to_string(), json!("SELECT"));
    attributes.insert("db.sql.table".to_string(), json!("productservice"));
    attributes.insert(
        "db.statement".to_string(),
        json!("SHOW FULL TABLES FROM `productservice` LIKE ?"),
    );
    attributes.insert(
        "net.peer.name".to_string(),
        json!("mysql-svc.mysql.svc.cluster.local"),
    );
    attributes.insert("net.peer.port".to_string(), json!(3306));
    attributes.insert(
        "db.connection_string".to_string(),
        json!("mysql://mysql-svc.mysql.svc.cluster.local:3306"),
    );
    attributes
}

/// Resource-level attributes: host, process, Kubernetes and SDK identity.
pub fn resource_attributes() -> AttributeMap {
    let entries = [
        ("os.type", json!("linux")),
        ("os.description", json!("Linux 5.15.133+")),
        ("host.arch", json!("amd64")),
        ("host.name", json!("order-6bfc474747-w9mbc")),
        ("process.pid", json!(1)),
        (
            "container.id",
            json!("5956c751c51121a467d29cb265eb169970e6aba70bd30a3427bbca8ccea52d39"),
        ),
        ("service.name", json!("order")),
        ("service.version", json!("configurable")),
        ("k8s.pod.name", json!("order-6bfc474747-w9mbc")),
        (
            "k8s.node.name",
            json!("gke-devclient03-default-pool-3cfcf5c9-fhkc"),
        ),
        ("k8s.container.name", json!("order")),
        ("k8s.namespace.name", json!("sofa-shop-mysql")),
        ("k8s.deployment.name", json!("order")),
        ("k8s.replicaset.name", json!("order-6bfc474747")),
        ("telemetry.sdk.name", json!("opentelemetry")),
        ("telemetry.sdk.version", json!("1.30.1")),
        ("telemetry.sdk.language", json!("java")),
        ("telemetry.auto.version", json!("1.30.0")),
        ("process.runtime.name", json!("OpenJDK Runtime Environment")),
        ("process.runtime.version", json!("17.0.2+8-86")),
        (
            "process.runtime.description",
            json!("Oracle Corporation OpenJDK 64-Bit Server VM 17.0.2+8-86"),
        ),
        (
            "process.executable.path",
            json!("/usr/local/openjdk-17/bin/java"),
        ),
    ];

    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_db_client_attributes() {
        let mut rng = StdRng::seed_from_u64(42);
        let attributes = db_client_attributes(&mut rng);

        assert_eq!(attributes["db.system"], "mysql");
        assert_eq!(attributes["net.peer.port"], 3306);
        let thread_id = attributes["thread.id"].as_u64().unwrap();
        assert!((1..=64).contains(&thread_id));
    }

    #[test]
    fn test_resource_attributes() {
        let attributes = resource_attributes();
        assert_eq!(attributes["k8s.namespace.name"], "sofa-shop-mysql");
        assert_eq!(attributes["telemetry.sdk.language"], "java");
        assert_eq!(attributes.len(), 22);
    }
}

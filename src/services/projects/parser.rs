//! Compose file parser
//!
//! Several service fields may be written in more than one shape (`build` as a
//! string or a mapping, `environment` as a mapping or a list, ...). Each raw
//! field is decoded once into a [`FieldShape`] and then normalized by a small
//! per-field function. A field whose shape does not fit is left empty; only a
//! document that is not YAML at all fails the parse.

use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::domain::project::{ProjectNetwork, ServiceDef};

use super::error::ProjectError;

/// A parsed compose file
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub services: BTreeMap<String, ServiceDef>,
    pub networks: Vec<ProjectNetwork>,
}

/// Decoded shape of a single service field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Scalar(String),
    /// String items only; other items are dropped
    Sequence(Vec<String>),
    /// String keys only; `None` marks a value that is not a string
    Mapping(BTreeMap<String, Option<String>>),
}

impl FieldShape {
    /// `None` for absent fields and for numbers, booleans and nulls
    pub fn decode(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::String(s) => Some(Self::Scalar(s.clone())),
            Value::Sequence(items) => Some(Self::Sequence(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect(),
            )),
            Value::Mapping(map) => Some(Self::Mapping(
                map.iter()
                    .filter_map(|(k, v)| {
                        let key = k.as_str()?;
                        Some((key.to_string(), v.as_str().map(String::from)))
                    })
                    .collect(),
            )),
            Value::Tagged(tagged) => Self::decode(Some(&tagged.value)),
            _ => None,
        }
    }
}

/// Plain string fields: `image`, `restart`
pub fn normalize_scalar(shape: Option<FieldShape>) -> String {
    match shape {
        Some(FieldShape::Scalar(s)) => s,
        _ => String::new(),
    }
}

/// `build: ./dir` or `build: { context: ./dir }`
pub fn normalize_build(shape: Option<FieldShape>) -> String {
    match shape {
        Some(FieldShape::Scalar(s)) => s,
        Some(FieldShape::Mapping(mut map)) => map.remove("context").flatten().unwrap_or_default(),
        _ => String::new(),
    }
}

/// List-only fields: `ports`, `volumes`
pub fn normalize_list(shape: Option<FieldShape>) -> Vec<String> {
    match shape {
        Some(FieldShape::Sequence(items)) => items,
        _ => Vec::new(),
    }
}

/// `environment` as a mapping or a list
///
/// List entries become keys with an empty value; `KEY=VALUE` entries are
/// kept whole.
pub fn normalize_environment(shape: Option<FieldShape>) -> BTreeMap<String, String> {
    match shape {
        Some(FieldShape::Mapping(map)) => map
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect(),
        Some(FieldShape::Sequence(items)) => {
            items.into_iter().map(|item| (item, String::new())).collect()
        }
        _ => BTreeMap::new(),
    }
}

/// `depends_on` / `networks` as a list or a mapping keyed by name
pub fn normalize_name_set(shape: Option<FieldShape>) -> BTreeSet<String> {
    match shape {
        Some(FieldShape::Sequence(items)) => items.into_iter().collect(),
        Some(FieldShape::Mapping(map)) => map.into_keys().collect(),
        _ => BTreeSet::new(),
    }
}

/// `command` as a string, or a list rendered as `[part part ...]`
///
/// An empty list yields an empty command.
pub fn normalize_command(shape: Option<FieldShape>) -> String {
    match shape {
        Some(FieldShape::Scalar(s)) => s,
        Some(FieldShape::Sequence(parts)) if !parts.is_empty() => {
            format!("[{}]", parts.join(" "))
        }
        _ => String::new(),
    }
}

/// Build a service definition from its raw YAML node
///
/// Anything other than a mapping yields an all-empty definition.
pub fn parse_service(raw: &Value) -> ServiceDef {
    let Some(fields) = raw.as_mapping() else {
        return ServiceDef::default();
    };
    let field = |key: &str| FieldShape::decode(fields.get(key));

    ServiceDef {
        image: normalize_scalar(field("image")),
        build: normalize_build(field("build")),
        ports: normalize_list(field("ports")),
        environment: normalize_environment(field("environment")),
        volumes: normalize_list(field("volumes")),
        depends_on: normalize_name_set(field("depends_on")),
        networks: normalize_name_set(field("networks")),
        restart: normalize_scalar(field("restart")),
        command: normalize_command(field("command")),
    }
}

fn parse_networks(raw: Option<&Value>) -> Vec<ProjectNetwork> {
    let Some(networks) = raw.and_then(Value::as_mapping) else {
        return Vec::new();
    };

    let mut result: Vec<ProjectNetwork> = networks
        .iter()
        .filter_map(|(name, config)| {
            let name = name.as_str()?.to_string();
            let (driver, config) = match config.as_mapping() {
                Some(map) => (
                    map.get("driver")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    mapping_to_json(map),
                ),
                None => (String::new(), serde_json::Value::Object(Default::default())),
            };
            Some(ProjectNetwork {
                name,
                driver,
                config,
            })
        })
        .collect();

    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

/// Network options as JSON; entries that have no JSON form are dropped
fn mapping_to_json(map: &Mapping) -> serde_json::Value {
    let object = map
        .iter()
        .filter_map(|(k, v)| {
            let key = k.as_str()?.to_string();
            let value = serde_json::to_value(v).ok()?;
            Some((key, value))
        })
        .collect();
    serde_json::Value::Object(object)
}

/// Parse a compose document
///
/// Only a document that is not YAML is a parse error. An empty document, or
/// one whose top level is not a mapping, has no services. Merge keys
/// (`<<: *anchor`) are resolved before fields are read.
pub fn parse(name: &str, path: PathBuf, content: &[u8]) -> Result<ProjectDescriptor, ProjectError> {
    let parse_error = |e: serde_yaml::Error| ProjectError::Parse {
        project: name.to_string(),
        message: e.to_string(),
    };

    let mut document: Value = if content.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_yaml::from_slice(content).map_err(parse_error)?
    };
    document.apply_merge().map_err(parse_error)?;

    let top = match document {
        Value::Mapping(map) => map,
        _ => Mapping::new(),
    };

    let services: BTreeMap<String, ServiceDef> = top
        .get("services")
        .and_then(Value::as_mapping)
        .map(|services| {
            services
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), parse_service(v))))
                .collect()
        })
        .unwrap_or_default();

    Ok(ProjectDescriptor {
        name: name.to_string(),
        path,
        services,
        networks: parse_networks(top.get("networks")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(yaml: &str) -> ProjectDescriptor {
        parse("demo", PathBuf::from("/srv/demo"), yaml.as_bytes()).unwrap()
    }

    fn yaml(raw: &str) -> Value {
        serde_yaml::from_str(raw).unwrap()
    }

    #[test]
    fn test_decode_shapes() {
        assert_eq!(
            FieldShape::decode(Some(&yaml("hello"))),
            Some(FieldShape::Scalar("hello".to_string()))
        );
        assert_eq!(
            FieldShape::decode(Some(&yaml("[a, 1, b]"))),
            Some(FieldShape::Sequence(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            FieldShape::decode(Some(&yaml("{a: x, b: 2}"))),
            Some(FieldShape::Mapping(BTreeMap::from([
                ("a".to_string(), Some("x".to_string())),
                ("b".to_string(), None),
            ])))
        );
        assert_eq!(FieldShape::decode(Some(&yaml("42"))), None);
        assert_eq!(FieldShape::decode(None), None);
    }

    #[test]
    fn test_build_shapes() {
        assert_eq!(normalize_build(FieldShape::decode(Some(&yaml("./app")))), "./app");
        assert_eq!(
            normalize_build(FieldShape::decode(Some(&yaml("{context: ./ctx, dockerfile: Dockerfile.dev}")))),
            "./ctx"
        );
        assert_eq!(normalize_build(FieldShape::decode(Some(&yaml("{dockerfile: x}")))), "");
        assert_eq!(normalize_build(FieldShape::decode(Some(&yaml("[a]")))), "");
    }

    #[test]
    fn test_environment_list_is_not_split() {
        let env = normalize_environment(FieldShape::decode(Some(&yaml(r#"["A=1", "B"]"#))));
        assert_eq!(
            env,
            BTreeMap::from([
                ("A=1".to_string(), String::new()),
                ("B".to_string(), String::new()),
            ])
        );
    }

    #[test]
    fn test_environment_mapping() {
        let env = normalize_environment(FieldShape::decode(Some(&yaml(
            "{A: '1', EMPTY: '', PORT: 8080, NULLED: null}",
        ))));
        assert_eq!(env.get("A").map(String::as_str), Some("1"));
        // empty string is kept, non-string values are skipped
        assert_eq!(env.get("EMPTY").map(String::as_str), Some(""));
        assert!(!env.contains_key("PORT"));
        assert!(!env.contains_key("NULLED"));
        assert_eq!(normalize_environment(FieldShape::decode(Some(&yaml("oops")))).len(), 0);
    }

    #[test]
    fn test_name_sets() {
        let from_list = normalize_name_set(FieldShape::decode(Some(&yaml("[db, cache, db]"))));
        assert_eq!(from_list.into_iter().collect::<Vec<_>>(), vec!["cache", "db"]);

        let from_map = normalize_name_set(FieldShape::decode(Some(&yaml(
            "{db: {condition: service_healthy}, cache: null}",
        ))));
        assert_eq!(from_map.into_iter().collect::<Vec<_>>(), vec!["cache", "db"]);

        assert!(normalize_name_set(FieldShape::decode(Some(&yaml("db")))).is_empty());
    }

    #[test]
    fn test_command_shapes() {
        assert_eq!(
            normalize_command(FieldShape::decode(Some(&yaml("npm start")))),
            "npm start"
        );
        assert_eq!(
            normalize_command(FieldShape::decode(Some(&yaml(r#"["node", "server.js", "--port", "80"]"#)))),
            "[node server.js --port 80]"
        );
        assert_eq!(normalize_command(FieldShape::decode(Some(&yaml("[1, 2]")))), "");
        assert_eq!(normalize_command(FieldShape::decode(Some(&yaml("{a: b}")))), "");
    }

    #[test]
    fn test_parse_full_service() {
        let descriptor = parse_str(
            r#"
services:
  web:
    image: nginx:alpine
    build:
      context: ./web
    ports: ["80:80", 443]
    environment:
      - DEBUG=1
    volumes:
      - ./html:/usr/share/nginx/html:ro
    depends_on: [db]
    networks:
      front: {}
    restart: unless-stopped
    command: ["nginx", "-g", "daemon off;"]
  db:
    image: postgres:16
networks:
  front:
    driver: bridge
    attachable: true
  back:
"#,
        );

        assert_eq!(descriptor.services.len(), 2);
        let web = &descriptor.services["web"];
        assert_eq!(web.image, "nginx:alpine");
        assert_eq!(web.build, "./web");
        assert_eq!(web.ports, vec!["80:80"]);
        assert_eq!(web.environment.get("DEBUG=1").map(String::as_str), Some(""));
        assert_eq!(web.volumes.len(), 1);
        assert!(web.depends_on.contains("db"));
        assert!(web.networks.contains("front"));
        assert_eq!(web.restart, "unless-stopped");
        assert_eq!(web.command, "[nginx -g daemon off;]");

        let db = &descriptor.services["db"];
        assert!(db.environment.is_empty());
        assert!(db.ports.is_empty());

        assert_eq!(descriptor.networks.len(), 2);
        assert_eq!(descriptor.networks[0].name, "back");
        assert_eq!(descriptor.networks[0].driver, "");
        assert_eq!(descriptor.networks[1].driver, "bridge");
        assert_eq!(descriptor.networks[1].config["attachable"], true);
    }

    #[test]
    fn test_malformed_fields_do_not_fail() {
        let descriptor = parse_str(
            r#"
services:
  odd:
    image: [not, a, string]
    ports: "8080:80"
    environment: 12
    depends_on: true
    command: {a: b}
  bare:
"#,
        );

        assert_eq!(descriptor.services.len(), 2);
        assert_eq!(descriptor.services["odd"], ServiceDef::default());
        assert_eq!(descriptor.services["bare"], ServiceDef::default());
    }

    #[test]
    fn test_empty_and_invalid_documents() {
        assert!(parse_str("").services.is_empty());
        assert!(parse_str("version: '3'\n").services.is_empty());
        assert!(parse_str("services: [a, b]\n").services.is_empty());

        assert!(matches!(
            parse("demo", PathBuf::new(), b"services: [unclosed"),
            Err(ProjectError::Parse { .. })
        ));
        // valid YAML that is not a mapping has no services
        assert!(parse_str("just a string").services.is_empty());
        assert!(parse_str("- a\n- b\n").services.is_empty());
        assert!(matches!(
            parse("demo", PathBuf::new(), b"services:\n  web: {image: [nginx\n"),
            Err(ProjectError::Parse { .. })
        ));
    }

    #[test]
    fn test_merge_keys_are_applied() {
        let descriptor = parse_str(
            r#"
x-common: &common
  image: nginx:alpine
  restart: always
  environment:
    TZ: UTC
services:
  web:
    <<: *common
    ports: ["80:80"]
  worker:
    <<: *common
    image: nginx:worker
"#,
        );

        let web = &descriptor.services["web"];
        assert_eq!(web.image, "nginx:alpine");
        assert_eq!(web.restart, "always");
        assert_eq!(web.environment.get("TZ").map(String::as_str), Some("UTC"));
        assert_eq!(web.ports, vec!["80:80"]);
        // explicit keys win over merged ones
        assert_eq!(descriptor.services["worker"].image, "nginx:worker");
        assert_eq!(descriptor.services["worker"].restart, "always");
    }
}

//! Builders: turning structural results into application values.

use lidy::errors::{CheckError, ErrorKind};
use lidy::{BuilderRegistry, Data, LidyError, LidyResult, Parser, Scalar};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Port(u16),
    Endpoint { host: String, port: u16 },
    Hosts(Vec<String>),
}

fn endpoint_builders() -> BuilderRegistry<Value> {
    let mut builders = BuilderRegistry::new();
    builders.register("port", |result: LidyResult<Value>| {
        let port = result.data.as_scalar().and_then(Scalar::as_i64).unwrap_or(-1);
        u16::try_from(port)
            .map(|port| Data::Built(Value::Port(port)))
            .map_err(|_| format!("{port} is not a valid port").into())
    });
    builders.register("endpoint", |result: LidyResult<Value>| {
        let host = result
            .get("host")
            .and_then(|r| r.data.as_str())
            .unwrap_or_default()
            .to_string();
        let port = match result.get("port").and_then(|r| r.data.as_built()) {
            Some(Value::Port(port)) => *port,
            _ => 80,
        };
        Ok(Data::Built(Value::Endpoint { host, port }))
    });
    builders
}

const ENDPOINT_SCHEMA: &str = r#"
main: endpoint
endpoint:
  _map: { host: string }
  _mapFacultative: { port: port }
port: { _range: "int" }
"#;

#[test]
fn builders_compose_bottom_up() {
    let parser = Parser::from_source("schema.yaml", ENDPOINT_SCHEMA, endpoint_builders()).unwrap();
    let result = parser
        .parse_str("content.yaml", "host: example.org\nport: 8080\n")
        .unwrap();
    assert_eq!(
        result.data.into_built(),
        Some(Value::Endpoint {
            host: "example.org".to_string(),
            port: 8080,
        })
    );
}

#[test]
fn builders_see_defaults_when_keys_are_absent() {
    let parser = Parser::from_source("schema.yaml", ENDPOINT_SCHEMA, endpoint_builders()).unwrap();
    let result = parser.parse_str("content.yaml", "host: localhost").unwrap();
    assert_eq!(
        result.data.as_built(),
        Some(&Value::Endpoint {
            host: "localhost".to_string(),
            port: 80,
        })
    );
}

#[test]
fn builder_errors_veto_the_match() {
    let parser = Parser::from_source("schema.yaml", ENDPOINT_SCHEMA, endpoint_builders()).unwrap();
    let error = match parser.parse_str("content.yaml", "host: a\nport: 70000\n") {
        Err(LidyError::Content(error)) => error,
        other => panic!("expected a content error, got {other:?}"),
    };
    assert!(error.any(|kind| matches!(
        kind,
        ErrorKind::Builder { rule, message } if rule == "port" && message == "70000 is not a valid port"
    )));
    let text = error.to_string();
    assert!(text.contains("key port: port failed ("), "{text}");
    assert!(text.contains("port: 70000 is not a valid port 2:7"), "{text}");
}

#[test]
fn builders_may_raise_positioned_check_errors() {
    let mut builders: BuilderRegistry<Value> = BuilderRegistry::new();
    builders.register("hosts", |result: LidyResult<Value>| {
        let list = result.data.as_list().cloned().unwrap_or_default();
        let mut hosts = Vec::new();
        for element in list.rest {
            let host = element.data.as_str().unwrap_or_default().to_string();
            if hosts.contains(&host) {
                let error = CheckError::new(
                    ErrorKind::Builder {
                        rule: "hosts".into(),
                        message: format!("duplicate host '{host}'"),
                    },
                    Some(element.position.clone()),
                );
                return Err(Box::new(error));
            }
            hosts.push(host);
        }
        Ok(Data::Built(Value::Hosts(hosts)))
    });

    let parser = Parser::from_source("schema.yaml", "main: hosts\nhosts: { _listOf: string }\n", builders)
        .unwrap();

    let result = parser.parse_str("content.yaml", "[a, b]").unwrap();
    assert_eq!(
        result.data.as_built(),
        Some(&Value::Hosts(vec!["a".into(), "b".into()]))
    );

    let error = parser.parse_str("content.yaml", "[a, b, a]").unwrap_err();
    assert!(error.to_string().contains("hosts: duplicate host 'a' 1:8"), "{error}");
}

#[test]
fn results_without_builders_pass_through() {
    let parser: Parser<Value> =
        Parser::from_source("schema.yaml", "main: { _listOf: int }", BuilderRegistry::new()).unwrap();
    let result = parser.parse_str("content.yaml", "[1, 2]").unwrap();
    let list = result.data.as_list().unwrap();
    let numbers: Vec<_> = list
        .rest
        .iter()
        .filter_map(|r| r.data.as_scalar().and_then(Scalar::as_i64))
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn builders_for_undeclared_rules_are_never_called() {
    let mut builders: BuilderRegistry<Value> = BuilderRegistry::new();
    builders.register("ghost", |_| panic!("ghost builder called"));
    let parser = Parser::from_source("schema.yaml", "main: int", builders).unwrap();
    assert!(parser.builders().has("ghost"));
    assert!(parser.parse_str("content.yaml", "3").is_ok());
}

#[test]
fn a_failing_option_does_not_leak_its_builder_result() {
    let mut builders: BuilderRegistry<Value> = BuilderRegistry::new();
    builders.register("small", |_| Ok(Data::Built(Value::Port(1))));
    let parser = Parser::from_source(
        "schema.yaml",
        "main: { _oneOf: [small, string] }\nsmall: { _range: \"int < 10\" }\n",
        builders,
    )
    .unwrap();

    assert_eq!(
        parser.parse_str("content.yaml", "5").unwrap().data.as_built(),
        Some(&Value::Port(1))
    );
    let result = parser.parse_str("content.yaml", "text").unwrap();
    assert_eq!(result.data.as_str(), Some("text"));
    assert!(parser.parse_str("content.yaml", "50").is_err());
}

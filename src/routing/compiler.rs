//! Route compilation.
//!
//! # Responsibilities
//! - Turn an API class's methods and doc comments into call descriptors
//! - Register each descriptor under its `@url` directives, or under the
//!   conventional URLs derived from the method name and signature
//!
//! # Conventional URLs
//! ```text
//! getUsers()                      GET  users
//! getUsers($id)                   GET  users/{id}
//! getUsers($id, $format='full')   GET  users/{id}
//! postUsers($request_data)        POST users
//! index()                         GET  <base path>
//! ```
//! A bare URL is only published when the method has no required parameter.
//! Only the placeholder URL ending at the first required parameter is
//! published; later required parameters arrive through the query or body.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::api::{ClassRegistry, MethodInfo, Visibility};
use crate::error::ConfigError;
use crate::metadata::{extract, MetadataRecord};
use crate::routing::table::{Access, CallDescriptor, ParameterDescriptor, RouteTable};
use crate::verb::Verb;

/// Reserved parameter receiving the whole decoded request data.
pub const REQUEST_DATA: &str = "request_data";

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteCompiler {
    compatibility_mode: bool,
}

impl RouteCompiler {
    pub fn new(compatibility_mode: bool) -> Self {
        Self { compatibility_mode }
    }

    /// Compile the class registered as `class_name` into `table`.
    ///
    /// Returns the number of routes registered.
    pub fn compile(
        &self,
        classes: &ClassRegistry,
        class_name: &str,
        base_path: Option<&str>,
        table: &mut RouteTable,
    ) -> Result<usize, ConfigError> {
        let class = classes.require(class_name)?;
        let base = base_path_for(class_name, base_path);
        let class_metadata = extract(class.doc());
        let mut registered = 0;

        for method in class.methods() {
            if method.visibility == Visibility::Private {
                continue;
            }
            let own = extract(&method.doc);
            let directives = own.url_directives();
            let metadata = own.merge_over(&class_metadata);
            if method.name.starts_with('_') || metadata.suppresses_routes() {
                tracing::trace!(class = %class_name, method = %method.name, "Skipping hidden method");
                continue;
            }

            let ignore_path_till = first_required_position(&method);
            let call = Arc::new(self.describe(class_name, &base, &method, metadata));
            let mut register = |verb: Verb, pattern: String| -> Result<(), ConfigError> {
                tracing::debug!(
                    verb = %verb,
                    pattern = %pattern,
                    class = %class_name,
                    method = %method.name,
                    "Registered route"
                );
                table.insert(verb, pattern, Arc::clone(&call))?;
                registered += 1;
                Ok(())
            };

            if !directives.is_empty() {
                for directive in directives {
                    let pattern = format!("{}{}", base, directive.path);
                    register(directive.verb, pattern.trim_end_matches('/').to_string())?;
                }
                continue;
            }

            let lowercase = method.name.to_lowercase();
            let (verb, slug) =
                Verb::strip_prefix(&lowercase).unwrap_or((Verb::Get, lowercase.as_str()));
            let slug = if slug == "index" { "" } else { slug };
            let mut url = if slug.is_empty() {
                base.trim_end_matches('/').to_string()
            } else {
                format!("{}{}", base, slug)
            };

            if ignore_path_till == 0 {
                register(verb, url.clone())?;
            }
            for (index, param) in method.params.iter().enumerate() {
                if !param.is_required() || param.name == REQUEST_DATA {
                    break;
                }
                if !url.is_empty() {
                    url.push('/');
                }
                url.push('{');
                url.push_str(&param.name);
                url.push('}');
                if index + 1 == ignore_path_till {
                    register(verb, url.clone())?;
                }
            }
        }

        tracing::info!(class = %class_name, base_path = %base, routes = registered, "Compiled API class");
        Ok(registered)
    }

    fn describe(
        &self,
        class_name: &str,
        base: &str,
        method: &MethodInfo,
        metadata: MetadataRecord,
    ) -> CallDescriptor {
        let mut arguments = IndexMap::new();
        let mut defaults = Vec::with_capacity(method.params.len());
        let mut params = Vec::with_capacity(method.params.len());

        for (position, param) in method.params.iter().enumerate() {
            arguments.insert(param.name.clone(), position);
            defaults.push(param.default.clone().unwrap_or(Value::Null));
            params.push(ParameterDescriptor {
                name: param.name.clone(),
                position,
                default: param.default.clone(),
                required: param.is_required(),
                validate: metadata
                    .params
                    .get(position)
                    .map(|tag| tag.validate.clone())
                    .unwrap_or_default(),
            });
        }

        let access = match method.visibility {
            Visibility::Protected if self.compatibility_mode => Access::ProtectedLegacy,
            Visibility::Protected => Access::ProtectedReflective,
            _ if metadata.is_protected() => Access::ProtectedExplicit,
            _ => Access::Public,
        };

        CallDescriptor {
            class_name: class_name.to_string(),
            path: base.trim_end_matches('/').to_string(),
            method_name: method.name.clone(),
            arguments,
            defaults,
            params,
            metadata,
            access,
        }
    }
}

/// Base path for a class: the given one, or the lowercase identifier with
/// `__v` turned into `/v`. Non-empty results end with `/`.
pub fn base_path_for(class_name: &str, base_path: Option<&str>) -> String {
    let base = match base_path {
        Some(path) => path.to_string(),
        None => class_name.to_lowercase().replace("__v", "/v"),
    };
    let base = base.trim_matches('/');
    if base.is_empty() {
        String::new()
    } else {
        format!("{}/", base)
    }
}

/// 1-based position of the first required parameter other than
/// `request_data`; 0 when there is none.
fn first_required_position(method: &MethodInfo) -> usize {
    method
        .params
        .iter()
        .position(|p| p.is_required() && p.name != REQUEST_DATA)
        .map_or(0, |index| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClass, ApiHandler};
    use crate::dispatch::RequestContext;
    use crate::error::CallError;
    use serde_json::json;

    struct Fixture {
        doc: &'static str,
        methods: Vec<MethodInfo>,
    }

    impl ApiClass for Fixture {
        fn doc(&self) -> &str {
            self.doc
        }

        fn methods(&self) -> Vec<MethodInfo> {
            self.methods.clone()
        }

        fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
            Box::new(Noop)
        }
    }

    struct Noop;

    impl ApiHandler for Noop {
        fn call(&mut self, _method: &str, _args: &[Value]) -> Result<Value, CallError> {
            Ok(Value::Null)
        }
    }

    fn compile_with(
        compiler: RouteCompiler,
        name: &str,
        base: Option<&str>,
        doc: &'static str,
        methods: Vec<MethodInfo>,
    ) -> RouteTable {
        let mut classes = ClassRegistry::new();
        classes.register(name, Arc::new(Fixture { doc, methods }));
        let mut table = RouteTable::new();
        compiler.compile(&classes, name, base, &mut table).unwrap();
        table
    }

    fn compile(name: &str, methods: Vec<MethodInfo>) -> RouteTable {
        compile_with(RouteCompiler::default(), name, None, "", methods)
    }

    #[test]
    fn test_base_path() {
        assert_eq!(base_path_for("Users", None), "users/");
        assert_eq!(base_path_for("Users__v2", None), "users/v2/");
        assert_eq!(base_path_for("Users", Some("/api/people/")), "api/people/");
        assert_eq!(base_path_for("Users", Some("")), "");
    }

    #[test]
    fn test_optional_only_method_gets_bare_route() {
        let table = compile(
            "Users",
            vec![MethodInfo::new("getUsers").optional("format", "summary")],
        );
        assert_eq!(table.patterns(Verb::Get), vec!["users/users"]);
    }

    #[test]
    fn test_single_required_parameter() {
        let table = compile(
            "Users",
            vec![MethodInfo::new("get").required("id").optional("format", "summary")],
        );
        assert_eq!(table.patterns(Verb::Get), vec!["users/{id}"]);
    }

    #[test]
    fn test_only_first_required_parameter_is_published() {
        let table = compile(
            "Files",
            vec![MethodInfo::new("getChunk").required("name").required("offset")],
        );
        assert_eq!(table.patterns(Verb::Get), vec!["files/chunk/{name}"]);
    }

    #[test]
    fn test_request_data_is_not_a_path_parameter() {
        let table = compile(
            "Users",
            vec![MethodInfo::new("post").required(REQUEST_DATA)],
        );
        assert_eq!(table.patterns(Verb::Post), vec!["users"]);
    }

    #[test]
    fn test_index_and_verb_prefix() {
        let table = compile(
            "Users",
            vec![
                MethodInfo::new("index"),
                MethodInfo::new("DELETEItem").required("id"),
                MethodInfo::new("search"),
            ],
        );
        assert_eq!(table.patterns(Verb::Get), vec!["users", "users/search"]);
        assert_eq!(table.patterns(Verb::Delete), vec!["users/item/{id}"]);
    }

    #[test]
    fn test_url_directives_replace_convention() {
        let table = compile(
            "Users",
            vec![MethodInfo::new("getUsers")
                .doc("/**\n * @url GET /\n * @url GET active/\n * @url POST :id/touch\n */")
                .required("id")],
        );
        assert_eq!(table.patterns(Verb::Get), vec!["users", "users/active"]);
        assert_eq!(table.patterns(Verb::Post), vec!["users/:id/touch"]);
    }

    #[test]
    fn test_hidden_methods_publish_nothing() {
        let table = compile(
            "Users",
            vec![
                MethodInfo::new("_json_getUsers"),
                MethodInfo::new("getSecret").doc("/** @url-\n */"),
                MethodInfo::new("getRaw").doc("/** @url- \n * @url GET raw */"),
                MethodInfo::new("getPrivate").private(),
            ],
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_access_flags() {
        let methods = vec![
            MethodInfo::new("getOpen"),
            MethodInfo::new("getTagged").doc("/** @protected */"),
            MethodInfo::new("getHidden").protected(),
        ];
        let table = compile("Users", methods.clone());
        let access = |table: &RouteTable, path: &str| table.find(Verb::Get, path).unwrap().call.access;

        assert_eq!(access(&table, "users/open"), Access::Public);
        assert_eq!(access(&table, "users/tagged"), Access::ProtectedExplicit);
        assert_eq!(access(&table, "users/hidden"), Access::ProtectedReflective);

        let legacy = compile_with(RouteCompiler::new(true), "Users", None, "", methods);
        assert_eq!(access(&legacy, "users/hidden"), Access::ProtectedLegacy);
    }

    #[test]
    fn test_descriptor_contents() {
        let table = compile_with(
            RouteCompiler::default(),
            "Users",
            Some("people"),
            "/**\n * People directory\n * @class Auth {realm=staff}\n */",
            vec![MethodInfo::new("getUsers")
                .doc("/**\n * Fetch one\n * @param int $id {min=1&max=99} user id\n */")
                .required("id")
                .optional("format", "summary")],
        );
        let found = table.find(Verb::Get, "people/users/7").unwrap();
        let call = found.call;

        assert_eq!(call.class_name, "Users");
        assert_eq!(call.path, "people");
        assert_eq!(call.arguments.get("format"), Some(&1));
        assert_eq!(call.defaults, vec![Value::Null, json!("summary")]);
        assert!(call.params[0].required);
        assert_eq!(call.params[0].validate.len(), 2);
        assert_eq!(call.params[1].default, Some(json!("summary")));
        assert_eq!(call.metadata.class_description.as_deref(), Some("People directory"));
        assert!(call.metadata.class_config("Auth").is_some());
    }

    #[test]
    fn test_missing_class() {
        let mut table = RouteTable::new();
        let err = RouteCompiler::default()
            .compile(&ClassRegistry::new(), "Ghost", None, &mut table)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingClass(name) if name == "Ghost"));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use crate::custom_tests::{CustomTestData, CustomTests, MemberType, Resource};
    use crate::diagnostics::{BuildError, Diagnostics, DIAG_INVALID_IMPORT, DIAG_MALFORMED_TEST};

    fn catalog(value: serde_json::Value) -> CustomTests {
        CustomTests::from_json(value).unwrap()
    }

    #[test]
    fn test_unknown_path_yields_empty_data() {
        let tests = catalog(json!({}));
        assert_eq!(
            tests.get_custom_test_data("api.Nope.nothing").unwrap(),
            CustomTestData::default()
        );
    }

    #[test]
    fn test_undefined_resource_is_fatal() {
        let tests = catalog(json!({
            "api": {"AudioContext": {"__resources": ["audio-blip"], "__base": "var instance = 1;"}}
        }));
        let err = tests.get_custom_test_data("api.AudioContext").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Resource audio-blip is not defined but referenced in api.AudioContext"
        );
    }

    #[test]
    fn test_resources_resolve_against_catalog() {
        let tests = catalog(json!({
            "__resources": {
                "audio-blip": {"type": "audio", "src": ["/media/blip.mp3", "/media/blip.ogg"]},
                "canvas": {"type": "instance", "src": "var c = document.createElement('canvas');"}
            },
            "api": {"AudioContext": {"__resources": ["audio-blip"]}}
        }));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test_api("AudioContext", Some("decodeAudioData"), MemberType::Property, &mut diagnostics)
            .unwrap();
        assert!(test.test.is_none());
        assert!(matches!(
            test.resources.get("audio-blip"),
            Some(Resource::Audio { src }) if src.len() == 2
        ));
        assert!(matches!(tests.resource("canvas"), Some(Resource::Instance { .. })));
    }

    #[test]
    fn test_bare_string_is_a_test() {
        let tests = catalog(json!({"css": {"properties": {"foo": "return true;"}}}));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test("css.properties.foo", &mut diagnostics)
            .unwrap();
        assert_eq!(test.test.as_deref(), Some("(function () {\n  return true;\n})()"));
    }

    #[test]
    fn test_base_and_test_share_one_wrapper() {
        let tests = catalog(json!({
            "javascript": {"builtins": {"Atomics": {"__base": "var a = 1;", "__test": "return a === 1;"}}}
        }));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test("javascript.builtins.Atomics", &mut diagnostics)
            .unwrap();
        assert_eq!(
            test.test.as_deref(),
            Some("(function () {\n  var a = 1;\n  return a === 1;\n})()")
        );
    }

    #[test]
    fn test_base_only_stands_in_for_the_test() {
        let tests = catalog(json!({"css": {"properties": {"bar": {"__base": "return 1;", "__test": false}}}}));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test("css.properties.bar", &mut diagnostics)
            .unwrap();
        assert_eq!(test.test.as_deref(), Some("(function () {\n  return 1;\n})()"));
    }

    #[test]
    fn test_interface_base_asserts_instance() {
        let tests = catalog(json!({"api": {"Node": {"__base": "var instance = document.body;"}}}));
        let mut diagnostics = Diagnostics::new();

        let iface = tests
            .get_custom_test_api("Node", None, MemberType::Property, &mut diagnostics)
            .unwrap();
        assert_eq!(
            iface.test.as_deref(),
            Some("(function () {\n  var instance = document.body;\n  return !!instance;\n})()")
        );

        let member = tests
            .get_custom_test_api("Node", Some("contains"), MemberType::Property, &mut diagnostics)
            .unwrap();
        assert_eq!(
            member.test.as_deref(),
            Some("(function () {\n  var instance = document.body;\n  return !!instance && \"contains\" in instance;\n})()")
        );
    }

    #[test]
    fn test_symbol_member_checks_instance() {
        let tests = catalog(json!({"api": {"Headers": {"__base": "var instance = new Headers();"}}}));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test_api("Headers", Some("@@iterator"), MemberType::Symbol, &mut diagnostics)
            .unwrap();
        assert!(test.test.unwrap().contains(
            "return !!instance && \"Symbol\" in self && \"iterator\" in Symbol && Symbol.iterator in instance;"
        ));
    }

    #[test]
    fn test_constructor_and_static_have_no_instance_test() {
        let tests = catalog(json!({"api": {"Blob": {"__base": "var instance = new Blob();"}}}));
        let mut diagnostics = Diagnostics::new();

        let ctor = tests
            .get_custom_test_api("Blob", Some("Blob"), MemberType::Constructor, &mut diagnostics)
            .unwrap();
        assert!(ctor.test.is_none());

        let stat = tests
            .get_custom_test_api("Blob", Some("from"), MemberType::Static, &mut diagnostics)
            .unwrap();
        assert!(stat.test.is_none());
    }

    #[test]
    fn test_member_false_keeps_default() {
        let tests = catalog(json!({
            "api": {"Node": {"__base": "var instance = document.body;", "contains": false, "isConnected": {"__test": false}}}
        }));
        let mut diagnostics = Diagnostics::new();
        for member in ["contains", "isConnected"] {
            let test = tests
                .get_custom_test_api("Node", Some(member), MemberType::Property, &mut diagnostics)
                .unwrap();
            assert!(test.test.is_none(), "{} should use the default probe", member);
        }
    }

    #[test]
    fn test_member_test_follows_both_bases() {
        let tests = catalog(json!({
            "api": {"Node": {
                "__base": "var instance = document.body;",
                "contains": {"__base": "var other = document.head;", "__test": "return instance.contains(other);"}
            }}
        }));
        let mut diagnostics = Diagnostics::new();
        let test = tests
            .get_custom_test_api("Node", Some("contains"), MemberType::Property, &mut diagnostics)
            .unwrap();
        assert_eq!(
            test.test.as_deref(),
            Some("(function () {\n  var instance = document.body;\n  var other = document.head;\n  return instance.contains(other);\n})()")
        );
    }

    #[test]
    fn test_promise_base_chains_then() {
        let tests = catalog(json!({"api": {"BatteryManager": {"__base": "var promise = navigator.getBattery();"}}}));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("BatteryManager", Some("level"), MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert!(code.contains("if (!promise) {"));
        assert!(code.contains("return {result: false, message: \"promise is falsy\"};"));
        assert!(code.contains("return promise.then(function (instance) {"));
        assert!(code.contains("return !!instance && \"level\" in instance;"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_callback_base_continues_asynchronously() {
        let tests = catalog(json!({
            "api": {"GeolocationPosition": {"__base": "navigator.geolocation.getCurrentPosition(callback);"}}
        }));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("GeolocationPosition", Some("coords"), MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert!(code.contains("function callback(instance) {"));
        assert!(code.contains("success(!!instance && \"coords\" in instance);"));
        assert!(code.ends_with("  return \"callback\";\n})()"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_import_splices_base_and_guards() {
        let tests = catalog(json!({
            "api": {
                "AudioContext": {"__base": "var instance = new AudioContext();"},
                "GainNode": {"__base": "<%api.AudioContext:ctx%>\nvar instance = ctx.createGain();"}
            }
        }));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("GainNode", None, MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert!(code.contains("var ctx = new AudioContext();"));
        assert!(code.contains("if (!ctx) {\n    return {result: false, message: \"ctx is falsy\"};\n  }"));
        assert!(code.contains("var instance = ctx.createGain();"));
        assert!(!code.contains("<%"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_import_as_instance_skips_guard() {
        let tests = catalog(json!({
            "api": {
                "Foo": {"__base": "var instance = new Foo();"},
                "Bar": {"__base": "<%api.Foo:instance%>"}
            }
        }));
        let mut diagnostics = Diagnostics::new();
        let resolved = tests
            .resolve_imports("api.Bar", "<%api.Foo:instance%>", &mut diagnostics)
            .unwrap();
        assert_eq!(resolved, "var instance = new Foo();");
    }

    #[test]
    fn test_import_renames_only_bindings() {
        let tests = catalog(json!({
            "api": {
                "Event": {"__base": "var instance = new Event(\"instance\", {}); var opts = {promise: 1, instance}; instance.instance = opts.promise;"},
                "Foo": {"__base": "<%api.Event:ev%>\nvar instance = ev;"}
            }
        }));
        let mut diagnostics = Diagnostics::new();
        let resolved = tests
            .resolve_imports("api.Foo", "<%api.Event:ev%>", &mut diagnostics)
            .unwrap();
        assert!(resolved.starts_with(
            "var ev = new Event(\"instance\", {}); var opts = {promise: 1, instance: ev}; ev.instance = opts.promise;"
        ));
        assert!(resolved.contains("if (!ev) {"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_import_renames_promise_binding() {
        let tests = catalog(json!({
            "api": {"Battery": {"__base": "var promise = navigator.getBattery(); var label = 'promise';"}}
        }));
        let mut diagnostics = Diagnostics::new();
        let resolved = tests
            .resolve_imports("api.Foo", "<%api.Battery:battery%>", &mut diagnostics)
            .unwrap();
        assert!(resolved.starts_with("var battery = navigator.getBattery(); var label = 'promise';"));
    }

    #[test]
    fn test_nested_promise_parameter_is_not_promise_shaped() {
        let tests = catalog(json!({
            "api": {"Foo": {"__base": "var instance = new Foo();\nfunction settle(promise) { return promise; }"}}
        }));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("Foo", Some("bar"), MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert!(code.contains("return !!instance && \"bar\" in instance;"));
        assert!(!code.contains("promise.then"));
    }

    #[test]
    fn test_sloppy_script_body_is_accepted() {
        let tests = catalog(json!({"api": {"Foo": {"__test": "var await = 1;\nreturn await === 1;"}}}));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("Foo", None, MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert_eq!(code, "(function () {\n  var await = 1;\n  return await === 1;\n})()");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_import_degrades_with_one_diagnostic() {
        let tests = catalog(json!({
            "api": {"Foo": {"__base": "<%api.foobar:apple%>\nvar instance = apple;"}}
        }));
        let mut diagnostics = Diagnostics::new();

        let iface = tests
            .get_custom_test_api("Foo", None, MemberType::Property, &mut diagnostics)
            .unwrap();
        let member = tests
            .get_custom_test_api("Foo", Some("bar"), MemberType::Property, &mut diagnostics)
            .unwrap();

        let throw = "throw \"Test is malformed: <%api.foobar:apple%> is an invalid import reference\";";
        assert!(iface.test.unwrap().contains(throw));
        let member = member.test.unwrap();
        assert!(member.contains(throw));
        assert!(member.contains("var instance = apple;"));

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.code, DIAG_INVALID_IMPORT);
        assert_eq!(diagnostic.path, "api.Foo");
    }

    #[test]
    fn test_cyclic_import_is_fatal() {
        let tests = catalog(json!({
            "api": {
                "A": {"__base": "<%api.B:b%>\nvar instance = b;"},
                "B": {"__base": "<%api.A:a%>\nvar instance = a;"}
            }
        }));
        let mut diagnostics = Diagnostics::new();
        let err = tests
            .get_custom_test_api("A", None, MemberType::Property, &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, BuildError::CyclicImport { ref path, .. } if path == "api.A"));
        assert_eq!(err.code(), "P-ERR-IMPORT-CYCLE");
    }

    #[test]
    fn test_unparsable_body_becomes_throwing_stub() {
        let tests = catalog(json!({"api": {"Foo": {"__test": "return (;"}}}));
        let mut diagnostics = Diagnostics::new();
        let code = tests
            .get_custom_test_api("Foo", None, MemberType::Property, &mut diagnostics)
            .unwrap()
            .test
            .unwrap();
        assert!(code.starts_with("(function () {\n  throw \"Test is malformed: "));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().code, DIAG_MALFORMED_TEST);
    }

    #[test]
    fn test_subtests_cover_additional_and_unknown_children() {
        let tests = catalog(json!({
            "api": {"Foo": {
                "__base": "var instance = new Foo();",
                "__additional": {"extra": "return !!instance.extra;"},
                "bar": {"__additional": {"sub": "return instance.bar(1) === 1;"}},
                "notIdl": "return 'notIdl' in instance;"
            }}
        }));
        let known: BTreeSet<String> = ["bar".to_string()].into_iter().collect();
        let mut diagnostics = Diagnostics::new();
        let subtests = tests
            .get_custom_subtests_api("Foo", &known, &mut diagnostics)
            .unwrap();

        let keys: Vec<&str> = subtests.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["bar.sub", "extra", "notIdl"]);
        assert_eq!(
            subtests["extra"].test.as_deref(),
            Some("(function () {\n  var instance = new Foo();\n  return !!instance.extra;\n})()")
        );
    }

    #[test]
    fn test_unknown_reserved_key_is_rejected() {
        let err = CustomTests::from_json(json!({"api": {"Foo": {"__bogus": "x"}}})).unwrap_err();
        assert_eq!(err.code(), "P-ERR-CATALOG");
    }
}

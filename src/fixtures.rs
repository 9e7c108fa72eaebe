#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::Settings;

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct Specification {
        #[config(embed)]
        pub embedded: Embedded,

        #[config(embed, ignored)]
        pub embedded_but_ignored: EmbeddedButIgnored,

        pub debug: bool,

        /// Port to listen on.
        pub port: i32,

        pub rate: f32,
        pub user: String,
        pub ttl: u32,
        pub timeout: Duration,
        pub admin_users: Vec<String>,
        pub magic_numbers: Vec<i32>,
        pub empty_numbers: Vec<i32>,
        pub color_codes: HashMap<String, i32>,
        pub multi_word_var: String,

        #[config(split_words)]
        pub multi_word_var_with_auto_split: u32,

        #[config(split_words, alias(envconfig = "MultiWordACRWithAutoSplit"))]
        pub multi_word_acr_with_auto_split: u32,

        pub some_pointer: Option<String>,

        #[config(default = "foo2baz", desc = "foorbar is the word")]
        pub some_pointer_with_default: Option<String>,

        #[config(alias(envconfig = "MULTI_WORD_VAR_WITH_ALT"), desc = "what alt")]
        pub multi_word_var_with_alt: String,

        #[config(alias(envconfig = "multi_word_var_with_lower_case_alt"))]
        pub multi_word_var_with_lower_case_alt: String,

        #[config(env = "SERVICE_HOST")]
        pub no_prefix_with_alt: String,

        #[config(default = "foobar")]
        pub default_var: String,

        #[config(required = "True")]
        pub required_var: String,

        #[config(alias(envconfig = "BROKER"), default = "127.0.0.1")]
        pub no_prefix_default: String,

        #[config(required, default = "foo2bar")]
        pub required_default: String,

        #[config(ignored)]
        pub ignored: String,

        #[config(nested, alias(envconfig = "outer"))]
        pub nested_specification: NestedSpecification,

        pub after_nested: String,

        #[config(default = "one=two,three=four")]
        pub map_field: HashMap<String, String>,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct Embedded {
        #[config(desc = "some embedded value")]
        pub enabled: bool,

        pub embedded_port: i32,

        #[config(file = "embedded_multi_word_var", alias(envconfig = "multiWordVarNested"))]
        pub multi_word_var: String,

        #[config(
            file = "embedded_multi_word_var_with_alt",
            alias(envconfig = "multiWordVarNestedAlt")
        )]
        pub multi_word_var_with_alt: String,

        #[config(env = "EMBEDDED_WITH_ALT")]
        pub embedded_alt: String,

        #[config(ignored)]
        pub embedded_ignored: String,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct EmbeddedButIgnored {
        pub first_embedded_but_ignored: String,
        pub second_embedded_but_ignored: String,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct NestedSpecification {
        #[config(alias(envconfig = "inner"))]
        pub property: String,

        #[config(default = "fuzzybydefault")]
        pub property_with_default: String,

        pub int_property: i32,
    }

    // -- Application-shaped fixture for resolver and snapshot tests -------------

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct TestConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080, short = "P")]
        pub port: u16,

        /// Enable verbose output.
        #[config(default = false)]
        pub verbose: bool,

        /// Request timeout.
        #[config(default = "30s")]
        pub timeout: Duration,

        /// Database settings.
        #[config(nested, file = "db")]
        pub database: TestDbConfig,

        /// Optional cache settings.
        #[config(nested)]
        pub cache: Option<CacheConfig>,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct CacheConfig {
        #[config(default = 64)]
        pub size_mb: u32,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct RequiredConfig {
        #[config(required)]
        pub token: String,

        #[config(default = "info")]
        pub level: String,
    }

    // -- Malformed specifications -----------------------------------------------

    #[derive(Settings, Default, Debug)]
    pub struct NotARecord(pub u32);

    #[derive(Settings, Default, Debug)]
    pub struct BadRequired {
        #[config(required = "maybe")]
        pub flag: bool,
    }

    #[derive(Settings, Default, Debug)]
    pub struct BadMapDefault {
        #[config(default = "one=two,three")]
        pub labels: HashMap<String, String>,
    }

    #[derive(Settings, Default, Debug)]
    pub struct BadShort {
        #[config(short = "ab")]
        pub name: String,
    }

    #[derive(Settings, Default, Debug)]
    pub struct Clashing {
        #[config(embed)]
        pub a: PortA,
        #[config(embed)]
        pub b: PortB,
    }

    #[derive(Settings, Default, Debug)]
    pub struct PortA {
        pub port: u16,
    }

    #[derive(Settings, Default, Debug)]
    pub struct PortB {
        pub port: u16,
    }

    #[derive(Settings, Default, Debug)]
    pub struct Shadowing {
        #[config(embed)]
        pub inner: PortA,
        pub port: u16,
    }

    #[derive(Settings, Default, Debug)]
    pub struct EmptyNames {
        #[config(env = "", flag = "", key = "")]
        pub listen_addr: String,
    }

    #[derive(Settings, Default, Debug, PartialEq)]
    pub struct Labels {
        #[config(default = "code=007,name=x")]
        pub labels: HashMap<String, String>,

        #[config(default = "red=1")]
        pub weights: HashMap<String, i64>,
    }

    #[derive(Settings, Default, Debug)]
    pub struct FlagClash {
        #[config(flag = "mode")]
        pub first: String,
        #[config(flag = "mode")]
        pub second: String,
    }

    #[derive(Settings, Default, Debug)]
    pub struct ReservedFlag {
        #[config(flag = "version")]
        pub release: String,
    }

    #[test]
    fn derive_assigns_leaf_and_nested_paths() {
        use crate::de::Value;

        let mut config = TestConfig::default();
        config
            .assign(&["port"], &Value::String("9000".into()))
            .unwrap();
        config
            .assign(&["database", "pool_size"], &Value::Integer(12))
            .unwrap();
        config
            .assign(&["cache", "size_mb"], &Value::Integer(8))
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database.pool_size, 12);
        assert_eq!(config.cache, Some(CacheConfig { size_mb: 8 }));
    }

    #[test]
    fn derive_rejects_unknown_path() {
        use crate::de::Value;

        let mut config = TestConfig::default();
        let err = config
            .assign(&["database", "nope"], &Value::Integer(1))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn materialize_fills_optional_records() {
        let mut config = TestConfig::default();
        assert_eq!(config.cache, None);
        config.materialize();
        assert_eq!(config.cache, Some(CacheConfig::default()));
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use drupalflow_core::ProjectConfig;

fn bench_config_populate(c: &mut Criterion) {
    let toml_text = r#"
project_type = "incubator"
base_host_name = "bench.localhost"

[sites.default]
install_profile_name = "standard"

[sites.blog]
install_profile_name = "minimal"

[php_variants.php74]
bin_dir = "/opt/php74/bin"

[php_variants.php81]
bin_dir = "/opt/php81/bin"

[database_servers.mysql57]
port = 3306

[database_servers.pgsql12]
driver = "pgsql"

[managed_drupal_extensions.foo.phpcs]
standard = "Drupal"
paths = ["src/", "foo.module"]
"#;

    c.bench_function("populate_config", |b| {
        b.iter(|| ProjectConfig::from_toml_str(black_box(toml_text)).unwrap())
    });
}

criterion_group!(benches, bench_config_populate);
criterion_main!(benches);

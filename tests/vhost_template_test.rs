use forge::nginx::{self, SiteKind, VhostContext};
use forge::Error;

fn proxy_context() -> VhostContext {
    let mut ctx = VhostContext::new("app.example.com");
    ctx.port = Some(3000);
    ctx
}

fn php_context() -> VhostContext {
    let mut ctx = VhostContext::new("blog.example.com");
    ctx.document_root = Some("/var/www/blog/public".into());
    ctx.php_version = Some("8.3".to_string());
    ctx
}

#[test]
fn every_creatable_kind_renders_without_leftover_placeholders() {
    for &kind in SiteKind::creatable() {
        let mut ctx = VhostContext::new("example.com");
        ctx.port = Some(3000);
        ctx.document_root = Some("/var/www/example.com".into());
        ctx.php_version = Some("8.3".to_string());

        for ssl in [false, true] {
            let rendered = nginx::render(kind, ssl, &ctx)
                .unwrap_or_else(|e| panic!("{} (ssl={}) failed: {}", kind, ssl, e));
            assert!(
                !rendered.contains("{{"),
                "{} (ssl={}) left a placeholder",
                kind,
                ssl
            );
        }
    }
}

#[test]
fn all_templates_carry_the_hardening_baseline() {
    let rendered = nginx::render(SiteKind::Nextjs, false, &proxy_context()).unwrap();
    assert!(rendered.contains("X-Frame-Options"));
    assert!(rendered.contains("X-Content-Type-Options"));
    assert!(rendered.contains("gzip on;"));
    assert!(rendered.contains("access_log /var/log/nginx/app.example.com.access.log;"));
}

#[test]
fn proxy_template_forwards_websocket_headers() {
    let rendered = nginx::render(SiteKind::Nuxt, false, &proxy_context()).unwrap();
    assert!(rendered.contains("proxy_set_header Upgrade $http_upgrade;"));
    assert!(rendered.contains("proxy_pass http://127.0.0.1:3000;"));
}

#[test]
fn php_template_denies_dotfiles_and_composer_internals() {
    let rendered = nginx::render(SiteKind::Php, false, &php_context()).unwrap();
    assert!(rendered.contains("location ~ /\\."));
    assert!(rendered.contains("composer\\.(json|lock)"));
    assert!(rendered.contains("fastcgi_pass unix:/var/run/php/php8.3-fpm.sock;"));
}

#[test]
fn ssl_variants_redirect_http_and_pin_tls_versions() {
    let rendered = nginx::render(SiteKind::Php, true, &php_context()).unwrap();
    assert!(rendered.contains("return 301 https://$host$request_uri;"));
    assert!(rendered.contains("ssl_protocols TLSv1.2 TLSv1.3;"));
    assert!(rendered.contains("ssl_certificate /etc/letsencrypt/live/blog.example.com/fullchain.pem;"));
    assert!(rendered.contains("Strict-Transport-Security"));
}

#[test]
fn static_template_has_no_backend_directives() {
    let mut ctx = VhostContext::new("docs.example.com");
    ctx.document_root = Some("/var/www/docs".into());
    let rendered = nginx::render(SiteKind::Static, false, &ctx).unwrap();
    assert!(!rendered.contains("proxy_pass"));
    assert!(!rendered.contains("fastcgi_pass"));
    assert!(rendered.contains("try_files $uri $uri/ =404;"));
}

#[test]
fn www_flag_controls_server_names() {
    let mut ctx = VhostContext::new("example.com");
    ctx.document_root = Some("/var/www/example.com".into());

    let with_www = nginx::render(SiteKind::Static, false, &ctx).unwrap();
    assert!(with_www.contains("server_name example.com www.example.com;"));

    ctx.include_www = false;
    let without_www = nginx::render(SiteKind::Static, false, &ctx).unwrap();
    assert!(without_www.contains("server_name example.com;"));
}

#[test]
fn unknown_kind_cannot_be_rendered() {
    let ctx = VhostContext::new("example.com");
    assert!(matches!(
        nginx::render(SiteKind::Unknown, false, &ctx),
        Err(Error::Parse(_))
    ));
}

#[test]
fn missing_context_value_names_the_variable() {
    let ctx = VhostContext::new("example.com"); // no document_root
    match nginx::render(SiteKind::Static, false, &ctx) {
        Err(Error::TemplateVariable(name)) => assert_eq!(name, "document_root"),
        other => panic!("expected TemplateVariable error, got {:?}", other.err()),
    }
}

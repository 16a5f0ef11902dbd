//! Hardened vhost templates.
//!
//! Placeholders use `{{key}}` syntax and are substituted by
//! [`super::render`]. The shared snippets (security headers, gzip, TLS
//! parameters) are injected the same way so every template carries the
//! same hardening baseline.

/// Security headers applied to every vhost.
pub const SECURITY_HEADERS: &str = "\
    # Security headers
    add_header X-Frame-Options \"SAMEORIGIN\" always;
    add_header X-Content-Type-Options \"nosniff\" always;
    add_header Referrer-Policy \"strict-origin-when-cross-origin\" always;
    add_header Permissions-Policy \"geolocation=(), microphone=(), camera=()\" always;";

/// Gzip settings for text-ish content types.
pub const GZIP_CONFIG: &str = "\
    gzip on;
    gzip_vary on;
    gzip_comp_level 5;
    gzip_min_length 256;
    gzip_types text/plain text/css application/json application/javascript
               application/xml image/svg+xml;";

/// TLS parameters for the SSL template variants.
pub const SSL_CONFIG: &str = "\
    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_prefer_server_ciphers on;
    ssl_session_cache shared:SSL:10m;
    ssl_session_timeout 1d;
    add_header Strict-Transport-Security \"max-age=63072000\" always;";

/// Reverse proxy to a local Node.js app (Next.js, Nuxt, plain Node).
pub const NODEJS_TEMPLATE: &str = "\
server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};

    access_log /var/log/nginx/{{domain}}.access.log;
    error_log /var/log/nginx/{{domain}}.error.log;

    client_max_body_size {{max_body_size}};

{{security_headers}}

{{gzip}}

    location / {
        proxy_pass http://127.0.0.1:{{port}};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection \"upgrade\";
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_cache_bypass $http_upgrade;
        proxy_read_timeout 60s;
    }

    location ~* \\.(jpg|jpeg|png|gif|ico|svg|webp|woff2?)$ {
        proxy_pass http://127.0.0.1:{{port}};
        expires 30d;
        add_header Cache-Control \"public, immutable\";
    }
}
";

/// PHP-FPM vhost.
pub const PHP_TEMPLATE: &str = "\
server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};

    root {{document_root}};
    index index.php index.html;

    access_log /var/log/nginx/{{domain}}.access.log;
    error_log /var/log/nginx/{{domain}}.error.log;

    client_max_body_size {{max_body_size}};

{{security_headers}}

{{gzip}}

    location / {
        try_files $uri $uri/ /index.php?$query_string;
    }

    location ~ \\.php$ {
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:/var/run/php/php{{php_version}}-fpm.sock;
        fastcgi_hide_header X-Powered-By;
    }

    location ~* \\.(jpg|jpeg|png|gif|ico|svg|webp|css|js|woff2?)$ {
        expires 30d;
        add_header Cache-Control \"public, immutable\";
    }

    # Never serve dotfiles or composer internals
    location ~ /\\. {
        deny all;
    }
    location ~* (composer\\.(json|lock)|\\.env)$ {
        deny all;
    }
}
";

/// Plain static file vhost.
pub const STATIC_TEMPLATE: &str = "\
server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};

    root {{document_root}};
    index index.html;

    access_log /var/log/nginx/{{domain}}.access.log;
    error_log /var/log/nginx/{{domain}}.error.log;

    client_max_body_size {{max_body_size}};

{{security_headers}}

{{gzip}}

    location / {
        try_files $uri $uri/ =404;
    }

    location ~* \\.(jpg|jpeg|png|gif|ico|svg|webp|css|js|woff2?)$ {
        expires 30d;
        add_header Cache-Control \"public, immutable\";
    }

    location ~ /\\. {
        deny all;
    }
}
";

/// Reverse proxy vhost with TLS terminated by nginx. Used when a
/// certificate already exists (certbot normally rewrites the port-80
/// vhost itself).
pub const NODEJS_TEMPLATE_SSL: &str = "\
server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};
    return 301 https://$host$request_uri;
}

server {
    listen 443 ssl http2;
    listen [::]:443 ssl http2;
    server_name {{server_names}};

    ssl_certificate /etc/letsencrypt/live/{{domain}}/fullchain.pem;
    ssl_certificate_key /etc/letsencrypt/live/{{domain}}/privkey.pem;
{{ssl}}

    access_log /var/log/nginx/{{domain}}.access.log;
    error_log /var/log/nginx/{{domain}}.error.log;

    client_max_body_size {{max_body_size}};

{{security_headers}}

{{gzip}}

    location / {
        proxy_pass http://127.0.0.1:{{port}};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection \"upgrade\";
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
        proxy_cache_bypass $http_upgrade;
    }
}
";

/// PHP-FPM vhost with TLS terminated by nginx.
pub const PHP_TEMPLATE_SSL: &str = "\
server {
    listen 80;
    listen [::]:80;
    server_name {{server_names}};
    return 301 https://$host$request_uri;
}

server {
    listen 443 ssl http2;
    listen [::]:443 ssl http2;
    server_name {{server_names}};

    ssl_certificate /etc/letsencrypt/live/{{domain}}/fullchain.pem;
    ssl_certificate_key /etc/letsencrypt/live/{{domain}}/privkey.pem;
{{ssl}}

    root {{document_root}};
    index index.php index.html;

    access_log /var/log/nginx/{{domain}}.access.log;
    error_log /var/log/nginx/{{domain}}.error.log;

    client_max_body_size {{max_body_size}};

{{security_headers}}

{{gzip}}

    location / {
        try_files $uri $uri/ /index.php?$query_string;
    }

    location ~ \\.php$ {
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:/var/run/php/php{{php_version}}-fpm.sock;
        fastcgi_hide_header X-Powered-By;
    }

    location ~ /\\. {
        deny all;
    }
}
";

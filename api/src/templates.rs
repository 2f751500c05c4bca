use tera::Tera;

lazy_static::lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = Tera::default();
        let sources = vec![
            ("base.html", include_str!("../templates/base.html")),
            ("login.html", include_str!("../templates/login.html")),
            ("portal.html", include_str!("../templates/portal.html")),
        ];
        if let Err(e) = tera.add_raw_templates(sources) {
            tracing::error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
        tera
    };
}

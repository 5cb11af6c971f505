//! Mock phpMyAdmin pages served by wiremock.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "root";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "a1b2c3";
pub const SESSION_COOKIE: &str = "phpMyAdmin=sess42";

/// Bytes of an empty gzip member.
pub const EMPTY_GZIP: &[u8] = &[
    0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

pub fn login_page(extra_fields: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><body>
<form method="post" action="index.php" name="login_form" class="disableAjax login hide js-show">
  <fieldset>
    <legend>Log in</legend>
    <input type="text" name="pma_username" id="input_username" value="" size="24" class="textfield"/>
    <input type="password" name="pma_password" id="input_password" value="" size="24" class="textfield" />
    {extra_fields}
    <input type="hidden" name="server" value="1" />
  </fieldset>
  <fieldset class="tblFooters">
    <input value="Go" type="submit" id="input_go" />
    <input type="hidden" name="target" value="index.php" />
    <input type="hidden" name="token" value="{TOKEN}" />
  </fieldset>
</form>
</body></html>"#
    )
}

pub fn main_page() -> String {
    format!(
        r#"<!DOCTYPE html><html><body>
<div id="serverinfo"><a href="index.php?token={TOKEN}" class="item">Server: localhost</a></div>
<ul id="topmenu" class="resizable-menu">
  <li><a href="server_databases.php?token={TOKEN}" class="tab">Databases</a></li>
  <li><a href="server_sql.php?token={TOKEN}" class="tab">SQL</a></li>
  <li><a href="server_export.php?server=1&amp;token={TOKEN}" class="tab">Export</a></li>
</ul>
</body></html>"#
    )
}

pub fn frameset_page() -> String {
    format!(
        r#"<html><frameset cols="200,*">
<frame frameborder="0" id="frame_navigation" src="navigation.php?token={TOKEN}" name="frame_navigation" />
<frame frameborder="0" id="frame_content" src="main.php?token={TOKEN}" name="frame_content" />
</frameset></html>"#
    )
}

pub fn export_page(databases: &[&str]) -> String {
    let options: String = databases
        .iter()
        .map(|db| format!(r#"<option value="{db}" selected="selected">{db}</option>"#))
        .collect();
    format!(
        r#"<!DOCTYPE html><html><body>
<form method="post" action="export.php" name="dump" class="disableAjax">
  <input type="hidden" name="db" value="" />
  <input type="hidden" name="token" value="{TOKEN}" />
  <input type="hidden" name="export_type" value="server" />
  <input type="hidden" name="export_method" value="quick" />
  <select name="db_select[]" id="db_select" size="10" multiple="multiple">{options}</select>
  <select id="plugins" name="what"><option value="sql" selected="selected">SQL</option><option value="csv">CSV</option></select>
  <input type="radio" name="output_format" value="sendit" id="radio_dump_asfile" checked="checked" />
  <input type="radio" name="output_format" value="astext" id="radio_view_as_text" />
  <select id="compression" name="compression">
    <option value="none">None</option>
    <option value="zip">zipped</option>
    <option value="gzip">gzipped</option>
  </select>
  <input type="submit" value="Go" id="buttonGo" />
</form>
</body></html>"#
    )
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// Serves the login page and accepts only [`USER`]/[`PASSWORD`]; a wrong
/// login gets the login page back.
pub async fn mount_login(server: &MockServer, login_body: String, landing_body: String) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .respond_with(html(login_body.clone()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/index.php"))
        .and(body_string_contains(format!("pma_username={USER}")))
        .and(body_string_contains(format!("pma_password={PASSWORD}")))
        .and(body_string_contains(format!("token={TOKEN}")))
        .respond_with(html(landing_body).insert_header("Set-Cookie", format!("{SESSION_COOKIE}; path=/")))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/index.php"))
        .respond_with(html(login_body))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Serves the export page, only to requests carrying the session cookie.
pub async fn mount_export_page(server: &MockServer, databases: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/server_export.php"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(export_page(databases)))
        .mount(server)
        .await;
}

pub async fn mount_export_download(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/export.php"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn dump_response(filename: &str, body: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/x-sql; charset=utf-8")
        .insert_header(
            "Content-Disposition",
            format!(r#"attachment; filename="{filename}""#).as_str(),
        )
        .set_body_bytes(body.to_vec())
}

/// Login, main page, export page and a `localhost.sql` download.
pub async fn mount_phpmyadmin(server: &MockServer, databases: &[&str], dump: &[u8]) {
    mount_login(server, login_page(""), main_page()).await;
    mount_export_page(server, databases).await;
    mount_export_download(server, dump_response("localhost.sql", dump)).await;
}

pub fn login_url(server: &MockServer) -> String {
    format!("{}/index.php", server.uri())
}

/// Decoded bodies of every POST to `/export.php`.
pub async fn export_submissions(server: &MockServer) -> Vec<Vec<(String, String)>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == "POST" && request.url.path() == "/export.php")
        .map(|request| {
            url::form_urlencoded::parse(&request.body)
                .into_owned()
                .collect()
        })
        .collect()
}

pub fn values<'a>(fields: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .collect()
}

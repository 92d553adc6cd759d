//! Plugin invocation parsing and the name-to-handler registry.
//!
//! The core hands raw `{{...}}` source through unchanged; everything about
//! resolving it happens here. Names map to handlers through an explicit
//! registry, and unknown names fall back to emitting the original source in
//! a wrapper element rather than failing.

use std::collections::HashMap;

/// A parsed plugin invocation: handler name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Handler name, the leading identifier of the source.
    pub name: String,
    /// Arguments, unquoted.
    pub args: Vec<String>,
}

/// Splits raw plugin source like `isbn_image('4-87311-866-3', 'label')`
/// into a name and its quoted or bare arguments. Parentheses and commas
/// are separators; quoted arguments may contain them and use backslash
/// escapes.
pub fn parse_invocation(source: &str) -> Invocation {
    let source = source.trim();
    let name_len = source
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let name = source[..name_len].to_string();
    let mut args = Vec::new();
    let mut chars = source[name_len..].chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            quote @ ('\'' | '"') => {
                let mut arg = String::new();
                while let Some(ch) = chars.next() {
                    if ch == '\\' {
                        if let Some(escaped) = chars.next() {
                            arg.push(escaped);
                        }
                    } else if ch == quote {
                        break;
                    } else {
                        arg.push(ch);
                    }
                }
                args.push(arg);
            }
            ' ' | '\t' | ',' | '(' | ')' => {}
            other => {
                let mut arg = String::from(other);
                while let Some(&ch) = chars.peek() {
                    if matches!(ch, ' ' | '\t' | ',' | '(' | ')' | '\'' | '"') {
                        break;
                    }
                    arg.push(ch);
                    chars.next();
                }
                args.push(arg);
            }
        }
    }
    Invocation { name, args }
}

/// Mutable renderer state a handler may touch.
pub struct PluginContext<'a> {
    /// Attachment directory stem derived from the source file name.
    pub attach_dir: &'a str,
    /// Footnote definitions, flushed at the end of the document.
    pub footnotes: &'a mut Vec<String>,
    /// The registry itself, for handlers that resolve nested invocations.
    pub registry: &'a PluginRegistry,
}

/// A plugin handler: receives renderer context and arguments, returns
/// pre-rendered markup.
pub type PluginHandler = fn(&mut PluginContext<'_>, &[String]) -> String;

/// Explicit mapping from plugin name to handler.
pub struct PluginRegistry {
    handlers: HashMap<&'static str, PluginHandler>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PluginRegistry {
            handlers: HashMap::new(),
        }
    }

    /// A registry with every built-in handler registered.
    pub fn with_builtins() -> Self {
        let mut registry = PluginRegistry::new();
        registry.register("br", br);
        registry.register("e", entity);
        registry.register("sub", sub_text);
        registry.register("fn", footnote);
        registry.register("toc", toc);
        registry.register("toc_here", toc);
        // Comments and trackbacks were dropped from the site; render nothing.
        registry.register("comment", empty);
        registry.register("trackback", empty);
        registry.register("speakerdeck", speakerdeck);
        registry.register("youtube", youtube);
        registry.register("backnumber", backnumber);
        registry.register("isbn", isbn);
        registry.register("isbn_image", isbn_image);
        registry.register("isbnImg", isbn_image);
        registry.register("amazon", isbn_image);
        registry.register("isbn_image_right", isbn_image_right);
        registry.register("isbnImgRight", isbn_image_right);
        registry.register("isbn_image_left", isbn_image_left);
        registry.register("isbnImgLeft", isbn_image_left);
        registry.register("attach_view", attach_view);
        registry.register("attach_image_anchor", attach_view);
        registry.register("attach_expandimg", attach_expandimg);
        registry.register("attach_anchor", attach_anchor);
        registry.register("attach_anchor_string", attach_anchor_string);
        registry
    }

    /// Registers or replaces a handler.
    pub fn register(&mut self, name: &'static str, handler: PluginHandler) {
        self.handlers.insert(name, handler);
    }

    /// Looks up a handler by name.
    pub fn get(&self, name: &str) -> Option<PluginHandler> {
        self.handlers.get(name).copied()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        PluginRegistry::with_builtins()
    }
}

/// Resolves one raw invocation in inline position. Unknown names log a
/// warning and fall back to the wrapped original source.
pub fn dispatch_inline(ctx: &mut PluginContext<'_>, source: &str) -> String {
    let invocation = parse_invocation(source);
    match ctx.registry.get(&invocation.name) {
        Some(handler) => handler(ctx, &invocation.args),
        None => {
            log::warn!(
                "unknown inline plugin '{}' in {}",
                invocation.name,
                ctx.attach_dir
            );
            format!(
                r#"<div class="plugin inline_plugin">{{{{{}}}}}</div>"#,
                html_escape::encode_text(source)
            )
        }
    }
}

/// Resolves one raw invocation in block position, with the block-level
/// fallback wrapper.
pub fn dispatch_block(ctx: &mut PluginContext<'_>, source: &str) -> String {
    let invocation = parse_invocation(source);
    match ctx.registry.get(&invocation.name) {
        Some(handler) => handler(ctx, &invocation.args),
        None => {
            log::warn!(
                "unknown block plugin '{}' in {}",
                invocation.name,
                ctx.attach_dir
            );
            format!(
                r#"<div class="plugin block_plugin">{{{{{}}}}}</div>"#,
                html_escape::encode_text(source)
            )
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize) -> &'a str {
    args.get(index).map(String::as_str).unwrap_or_default()
}

fn attach_path(ctx: &PluginContext<'_>, name: &str) -> String {
    format!("{{{{site.baseurl}}}}/images/{}/{}", ctx.attach_dir, name)
}

fn br(_ctx: &mut PluginContext<'_>, _args: &[String]) -> String {
    "<br />".to_string()
}

fn entity(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("&#{};", arg(args, 0))
}

fn sub_text(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("<sub>{}</sub>", arg(args, 0))
}

fn empty(_ctx: &mut PluginContext<'_>, _args: &[String]) -> String {
    String::new()
}

fn toc(_ctx: &mut PluginContext<'_>, _args: &[String]) -> String {
    "\n* Table of content\n{:toc}\n\n".to_string()
}

fn youtube(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    let id = arg(args, 0);
    format!(
        "<object width=\"560\" height=\"315\">\
         <param name=\"movie\" value=\"http://www.youtube.com/v/{id}\"></param>\
         <embed src=\"http://www.youtube.com/v/{id}\" \
         type=\"application/x-shockwave-flash\" width=\"560\" height=\"315\">\
         </embed></object>"
    )
}

fn backnumber(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!(
        "\n{{% for post in site.tags.{} %}}\n  - [{{{{ post.title }}}}]({{{{ post.url }}}})\n{{% endfor %}}\n",
        arg(args, 0)
    )
}

fn speakerdeck(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("\n[{}]({})", arg(args, 0), arg(args, 1))
}

fn isbn(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("{{% isbn('{}', '{}') %}}", arg(args, 0), arg(args, 1))
}

fn isbn_image(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("{{% isbn_image('{}', '{}') %}}", arg(args, 0), arg(args, 1))
}

fn isbn_image_right(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("{{% isbn_image_right('{}') %}}", arg(args, 0))
}

fn isbn_image_left(_ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("{{% isbn_image_left('{}') %}}", arg(args, 0))
}

fn attach_view(ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    let name = arg(args, 0);
    // The historical issue-title ornament has one canonical location.
    if name == "u26.gif" {
        return "![title_mark.gif]({{site.baseurl}}/images/title_mark.gif)".to_string();
    }
    format!("![{}]({})", name, attach_path(ctx, name))
}

fn attach_expandimg(ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    let name = arg(args, 0);
    format!("![{}]({})", name, attach_path(ctx, name))
}

fn attach_anchor(ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    let name = arg(args, 0);
    format!("[{}]({})", name, attach_path(ctx, name))
}

fn attach_anchor_string(ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    format!("[{}]({})", arg(args, 0), attach_path(ctx, arg(args, 1)))
}

fn footnote(ctx: &mut PluginContext<'_>, args: &[String]) -> String {
    let text = arg(args, 0).replace("&quot;", "\"");
    let text = resolve_footnote_links(&text);
    let text = resolve_footnote_plugins(ctx, &text);
    let number = ctx.footnotes.len() + 1;
    ctx.footnotes.push(format!("[^{number}]: {text}"));
    format!("[^{number}]")
}

/// Rewrites `[[title|target]]` spans inside footnote text to Markdown
/// links; bracket spans without a `|` pass through unchanged.
fn resolve_footnote_links(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(open) = rest.find("[[") {
        let Some(close_rel) = rest[open + 2..].find("]]") else {
            break;
        };
        let inner = &rest[open + 2..open + 2 + close_rel];
        match inner.split_once('|') {
            Some((title, target)) if !title.is_empty() => {
                out.push_str(&rest[..open]);
                out.push('[');
                out.push_str(title);
                out.push_str("](");
                out.push_str(target);
                out.push(')');
            }
            _ => out.push_str(&rest[..open + 2 + close_rel + 2]),
        }
        rest = &rest[open + 2 + close_rel + 2..];
    }
    out.push_str(rest);
    out
}

/// Resolves `{{...}}` spans inside footnote text through the registry.
/// The core's vault never sees footnote bodies, so the braces arrive raw.
fn resolve_footnote_plugins(ctx: &mut PluginContext<'_>, text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let Some(close_rel) = rest[open + 2..].find("}}") else {
            break;
        };
        if close_rel == 0 {
            out.push_str(&rest[..open + 2]);
            rest = &rest[open + 2..];
            continue;
        }
        out.push_str(&rest[..open]);
        let inner = rest[open + 2..open + 2 + close_rel].to_string();
        out.push_str(&dispatch_inline(ctx, &inner));
        rest = &rest[open + 2 + close_rel + 2..];
    }
    out.push_str(rest);
    out
}

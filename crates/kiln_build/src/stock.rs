//! Stock build providers for the directive source format.
//!
//! Kiln template sources are ordinary text with line-oriented `#` directives
//! carrying the compilation metadata:
//!
//! ```text
//! #type IndexPage          declared generated type name (optional)
//! #method Render(int)      member of the current type block
//! #field title string      typed field member
//! #prop OnLoad             other named member
//! #partial SiteHelpers     opens a partial-type fragment block
//! #use /shared/menu.frag   dependency recorded for invalidation
//! #require header.frag     dependency that is also compiled before this one
//! #descriptor text...      custom descriptor persisted with the artifact
//! ```
//!
//! Unrecognized lines are template content and ignored here. Relative paths
//! in `#use`/`#require` resolve against the source's directory.

use crate::backend::TEMPLATE_BACKEND;
use crate::error::BuildError;
use crate::manager::BuildContext;
use crate::provider::BuildProvider;
use crate::unit::{CodeUnit, Member, TypeDecl};
use kiln_common::VirtualPath;

/// Parsed directive metadata for one source.
#[derive(Debug, Default)]
pub(crate) struct ParsedSource {
    pub type_name: Option<String>,
    pub main_members: Vec<Member>,
    pub partials: Vec<TypeDecl>,
    pub uses: Vec<VirtualPath>,
    pub requires: Vec<VirtualPath>,
    pub descriptor: Option<String>,
}

/// Parses the directive lines out of a source text.
///
/// The parser is tolerant: lines that are not recognized directives are
/// template content, and malformed directive operands are skipped.
pub(crate) fn parse_source(text: &str, source: &VirtualPath) -> ParsedSource {
    let mut parsed = ParsedSource::default();
    // Index into `parsed.partials` of the open block; None targets the main type.
    let mut current: Option<usize> = None;
    let dir = source.directory();

    for line in text.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('#') else {
            continue;
        };
        let (directive, operand) = match rest.split_once(char::is_whitespace) {
            Some((d, o)) => (d, o.trim()),
            None => (rest, ""),
        };

        match directive {
            "type" if !operand.is_empty() => {
                parsed.type_name = Some(operand.to_string());
                current = None;
            }
            "partial" if !operand.is_empty() => {
                parsed.partials.push(TypeDecl {
                    name: operand.to_string(),
                    is_partial: true,
                    members: Vec::new(),
                });
                current = Some(parsed.partials.len() - 1);
            }
            "method" if !operand.is_empty() => {
                if let Some(member) = parse_method(operand) {
                    push_member(&mut parsed, current, member);
                }
            }
            "field" if !operand.is_empty() => {
                if let Some((name, ty)) = operand.split_once(char::is_whitespace) {
                    push_member(
                        &mut parsed,
                        current,
                        Member::Field {
                            name: name.to_string(),
                            ty: ty.trim().to_string(),
                        },
                    );
                }
            }
            "prop" if !operand.is_empty() => {
                push_member(
                    &mut parsed,
                    current,
                    Member::Other {
                        name: operand.to_string(),
                    },
                );
            }
            "use" if !operand.is_empty() => {
                if let Some(path) = resolve_operand_path(&dir, operand) {
                    parsed.uses.push(path);
                }
            }
            "require" if !operand.is_empty() => {
                if let Some(path) = resolve_operand_path(&dir, operand) {
                    parsed.requires.push(path);
                }
            }
            "descriptor" if !operand.is_empty() => {
                parsed.descriptor = Some(operand.to_string());
            }
            _ => {}
        }
    }

    parsed
}

fn push_member(parsed: &mut ParsedSource, current: Option<usize>, member: Member) {
    match current {
        Some(idx) => parsed.partials[idx].members.push(member),
        None => parsed.main_members.push(member),
    }
}

fn parse_method(operand: &str) -> Option<Member> {
    let (name, params) = match operand.split_once('(') {
        Some((name, rest)) => {
            let inner = rest.trim_end().strip_suffix(')')?;
            let params = inner
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            (name.trim(), params)
        }
        None => (operand, Vec::new()),
    };
    if name.is_empty() {
        return None;
    }
    Some(Member::Method {
        name: name.to_string(),
        params,
    })
}

fn resolve_operand_path(dir: &VirtualPath, operand: &str) -> Option<VirtualPath> {
    let raw = if operand.starts_with('/') {
        operand.to_string()
    } else {
        format!("{}/{}", dir.as_str().trim_end_matches('/'), operand)
    };
    VirtualPath::new(&raw).ok()
}

/// Derives the default generated type name from a source path:
/// `index.page` becomes `IndexPage`.
pub(crate) fn default_type_name(path: &VirtualPath) -> String {
    let mut name = sanitize_capitalized(path.file_stem());
    if let Some(ext) = path.extension() {
        name.push_str(&sanitize_capitalized(ext));
    }
    name
}

fn sanitize_capitalized(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for (i, c) in part.chars().enumerate() {
        let c = if c.is_alphanumeric() { c } else { '_' };
        if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Compiles every `#require` target before the requiring source.
fn build_requires(ctx: &BuildContext<'_>, requires: &[VirtualPath]) -> Result<(), BuildError> {
    for required in requires {
        ctx.compiled_module(required)?;
    }
    Ok(())
}

fn collect_dependencies(source: &VirtualPath, parsed: &ParsedSource) -> Vec<VirtualPath> {
    let mut deps = vec![source.clone()];
    for path in parsed.uses.iter().chain(parsed.requires.iter()) {
        if !deps.contains(path) {
            deps.push(path.clone());
        }
    }
    deps
}

/// Provider for markup sources: pages, fragments, and layouts.
///
/// The generated main type is a partial fragment (it is merged with
/// user-written code-behind for the same type at compile time), so markup
/// sources always count against the batch size limit.
pub struct MarkupProvider {
    path: VirtualPath,
    type_name: Option<String>,
    descriptor: Option<String>,
}

impl MarkupProvider {
    /// Creates a provider for one markup source.
    pub fn new(path: VirtualPath) -> Self {
        Self {
            path,
            type_name: None,
            descriptor: None,
        }
    }
}

impl BuildProvider for MarkupProvider {
    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn backend_kind(&self) -> &str {
        TEMPLATE_BACKEND
    }

    fn generate_code(&mut self, ctx: &BuildContext<'_>) -> Result<CodeUnit, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        build_requires(ctx, &parsed.requires)?;

        let name = parsed
            .type_name
            .clone()
            .unwrap_or_else(|| default_type_name(&self.path));
        self.type_name = Some(name.clone());
        self.descriptor = parsed.descriptor;

        let mut types = vec![TypeDecl {
            name,
            is_partial: true,
            members: parsed.main_members,
        }];
        types.extend(parsed.partials);

        Ok(CodeUnit {
            source: self.path.clone(),
            types,
        })
    }

    fn dependencies(&self, ctx: &BuildContext<'_>) -> Result<Vec<VirtualPath>, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        Ok(collect_dependencies(&self.path, &parsed))
    }

    fn generated_type_name(&self) -> Option<String> {
        self.type_name.clone()
    }

    fn custom_descriptor(&self) -> Option<String> {
        self.descriptor.clone()
    }
}

/// Provider for directive-only sources: service stubs and the like.
///
/// A source with no type directives and no members is a declarative stub
/// producing an empty unit; its slot may yield no module at all.
pub struct DirectiveProvider {
    path: VirtualPath,
    type_name: Option<String>,
    descriptor: Option<String>,
}

impl DirectiveProvider {
    /// Creates a provider for one directive source.
    pub fn new(path: VirtualPath) -> Self {
        Self {
            path,
            type_name: None,
            descriptor: None,
        }
    }
}

impl BuildProvider for DirectiveProvider {
    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn backend_kind(&self) -> &str {
        TEMPLATE_BACKEND
    }

    fn generate_code(&mut self, ctx: &BuildContext<'_>) -> Result<CodeUnit, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        build_requires(ctx, &parsed.requires)?;
        self.descriptor = parsed.descriptor;

        if parsed.type_name.is_none() && parsed.main_members.is_empty() && parsed.partials.is_empty()
        {
            return Ok(CodeUnit::declarative(self.path.clone()));
        }

        let mut types = Vec::new();
        if parsed.type_name.is_some() || !parsed.main_members.is_empty() {
            let name = parsed
                .type_name
                .clone()
                .unwrap_or_else(|| default_type_name(&self.path));
            self.type_name = Some(name.clone());
            types.push(TypeDecl {
                name,
                is_partial: false,
                members: parsed.main_members,
            });
        }
        types.extend(parsed.partials);

        Ok(CodeUnit {
            source: self.path.clone(),
            types,
        })
    }

    fn dependencies(&self, ctx: &BuildContext<'_>) -> Result<Vec<VirtualPath>, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        Ok(collect_dependencies(&self.path, &parsed))
    }

    fn generated_type_name(&self) -> Option<String> {
        self.type_name.clone()
    }

    fn custom_descriptor(&self) -> Option<String> {
        self.descriptor.clone()
    }
}

/// Provider compiling a themed directory into one module.
pub struct ThemeProvider {
    path: VirtualPath,
    type_name: Option<String>,
}

impl ThemeProvider {
    /// Creates a provider for a theme directory.
    pub fn new(path: VirtualPath) -> Self {
        Self {
            path,
            type_name: None,
        }
    }
}

impl BuildProvider for ThemeProvider {
    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn backend_kind(&self) -> &str {
        TEMPLATE_BACKEND
    }

    fn generate_code(&mut self, ctx: &BuildContext<'_>) -> Result<CodeUnit, BuildError> {
        let files = ctx
            .vfs()
            .list_directory(&self.path)
            .ok_or_else(|| BuildError::NotFound {
                path: self.path.as_str().to_string(),
            })?;

        let name = format!("{}Theme", sanitize_capitalized(self.path.file_stem()));
        self.type_name = Some(name.clone());

        let members = files
            .iter()
            .map(|f| Member::Other {
                name: sanitize_capitalized(f.file_stem()),
            })
            .collect();

        Ok(CodeUnit {
            source: self.path.clone(),
            types: vec![TypeDecl {
                name,
                is_partial: false,
                members,
            }],
        })
    }

    fn dependencies(&self, ctx: &BuildContext<'_>) -> Result<Vec<VirtualPath>, BuildError> {
        Ok(ctx.vfs().list_directory(&self.path).unwrap_or_default())
    }

    fn generated_type_name(&self) -> Option<String> {
        self.type_name.clone()
    }
}

/// Provider for the application entry file.
///
/// Same directive format as markup, but the generated type is not partial:
/// there is exactly one application type and nothing merges with it.
pub struct AppEntryProvider {
    path: VirtualPath,
    type_name: Option<String>,
    descriptor: Option<String>,
}

impl AppEntryProvider {
    /// Creates a provider for the application entry source.
    pub fn new(path: VirtualPath) -> Self {
        Self {
            path,
            type_name: None,
            descriptor: None,
        }
    }
}

impl BuildProvider for AppEntryProvider {
    fn virtual_path(&self) -> &VirtualPath {
        &self.path
    }

    fn backend_kind(&self) -> &str {
        TEMPLATE_BACKEND
    }

    fn generate_code(&mut self, ctx: &BuildContext<'_>) -> Result<CodeUnit, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        build_requires(ctx, &parsed.requires)?;

        let name = parsed
            .type_name
            .clone()
            .unwrap_or_else(|| default_type_name(&self.path));
        self.type_name = Some(name.clone());
        self.descriptor = parsed.descriptor;

        let mut types = vec![TypeDecl {
            name,
            is_partial: false,
            members: parsed.main_members,
        }];
        types.extend(parsed.partials);

        Ok(CodeUnit {
            source: self.path.clone(),
            types,
        })
    }

    fn dependencies(&self, ctx: &BuildContext<'_>) -> Result<Vec<VirtualPath>, BuildError> {
        let text = ctx.read_source(&self.path)?;
        let parsed = parse_source(&text, &self.path);
        Ok(collect_dependencies(&self.path, &parsed))
    }

    fn generated_type_name(&self) -> Option<String> {
        self.type_name.clone()
    }

    fn custom_descriptor(&self) -> Option<String> {
        self.descriptor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(s: &str) -> VirtualPath {
        VirtualPath::new(s).unwrap()
    }

    #[test]
    fn parses_members_into_main_and_partial_blocks() {
        let text = r#"
Welcome to the index page.

#type IndexPage
#method Render(int, string)
#field title string

#partial SiteHelpers
#method FormatDate(Date)
#prop Culture
"#;
        let parsed = parse_source(text, &vp("/site/index.page"));
        assert_eq!(parsed.type_name.as_deref(), Some("IndexPage"));
        assert_eq!(
            parsed.main_members,
            vec![
                Member::Method {
                    name: "Render".to_string(),
                    params: vec!["int".to_string(), "string".to_string()],
                },
                Member::Field {
                    name: "title".to_string(),
                    ty: "string".to_string(),
                },
            ]
        );
        assert_eq!(parsed.partials.len(), 1);
        let helpers = &parsed.partials[0];
        assert_eq!(helpers.name, "SiteHelpers");
        assert!(helpers.is_partial);
        assert_eq!(helpers.members.len(), 2);
    }

    #[test]
    fn template_content_is_ignored() {
        let text = "plain text\n<div>markup</div>\n#unknown directive\n";
        let parsed = parse_source(text, &vp("/site/a.page"));
        assert!(parsed.type_name.is_none());
        assert!(parsed.main_members.is_empty());
        assert!(parsed.partials.is_empty());
    }

    #[test]
    fn relative_use_resolves_against_source_directory() {
        let text = "#use menu.frag\n#require /shared/header.frag\n";
        let parsed = parse_source(text, &vp("/site/index.page"));
        assert_eq!(parsed.uses, vec![vp("/site/menu.frag")]);
        assert_eq!(parsed.requires, vec![vp("/shared/header.frag")]);
    }

    #[test]
    fn method_without_parens_has_no_params() {
        let parsed = parse_source("#method OnInit\n", &vp("/a.page"));
        assert_eq!(
            parsed.main_members,
            vec![Member::Method {
                name: "OnInit".to_string(),
                params: Vec::new(),
            }]
        );
    }

    #[test]
    fn empty_param_list() {
        let parsed = parse_source("#method OnInit()\n", &vp("/a.page"));
        assert_eq!(
            parsed.main_members,
            vec![Member::Method {
                name: "OnInit".to_string(),
                params: Vec::new(),
            }]
        );
    }

    #[test]
    fn malformed_directives_are_skipped() {
        let text = "#method (int)\n#field title\n#use not rooted spaces ok\n#method broken(int\n";
        let parsed = parse_source(text, &vp("/a.page"));
        assert!(parsed.main_members.is_empty());
        // `#use` operand resolves relative to the root.
        assert_eq!(parsed.uses.len(), 1);
    }

    #[test]
    fn descriptor_directive() {
        let parsed = parse_source("#descriptor handler=echo\n", &vp("/a.svc"));
        assert_eq!(parsed.descriptor.as_deref(), Some("handler=echo"));
    }

    #[test]
    fn default_type_names() {
        assert_eq!(default_type_name(&vp("/site/index.page")), "IndexPage");
        assert_eq!(default_type_name(&vp("/site/user-list.frag")), "User_listFrag");
        assert_eq!(default_type_name(&vp("/global.app")), "GlobalApp");
    }
}

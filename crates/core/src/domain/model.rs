// Intermediate Model
// Built inside the probe process, decoded once in the parent, then handed
// to the mock generator unchanged.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Package import path (e.g. "net/http")
pub type ImportPath = String;

/// A package and the interfaces requested from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Last component of the import path (not the declared package clause)
    pub name: String,
    /// In the order the symbols were requested
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    /// Every import path referenced by a named type anywhere in the package
    pub fn imports(&self) -> BTreeSet<ImportPath> {
        let mut imports = BTreeSet::new();
        for intf in &self.interfaces {
            for method in &intf.methods {
                method.collect_imports(&mut imports);
            }
        }
        imports
    }
}

/// A named interface type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    /// Declaration order as reported by the target type system
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl Interface {
    pub fn new(name: impl Into<String>, methods: Vec<Method>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }
}

/// A single interface method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub results: Vec<Parameter>,
    /// Trailing `...T` parameter; `ty` is the element type T
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variadic: Option<Parameter>,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
            variadic: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Parameter>) -> Self {
        self.params = params;
        self
    }

    pub fn with_results(mut self, results: Vec<Parameter>) -> Self {
        self.results = results;
        self
    }

    pub fn with_variadic(mut self, variadic: Parameter) -> Self {
        self.variadic = Some(variadic);
        self
    }

    /// Go spelling of the method signature without the name,
    /// e.g. `(ctx context.Context, keys ...string) (int, error)`
    pub fn signature(&self, qualifiers: &HashMap<String, String>, local_package: &str) -> String {
        render_signature(
            &self.params,
            self.variadic.as_ref(),
            &self.results,
            qualifiers,
            local_package,
        )
    }

    fn collect_imports(&self, imports: &mut BTreeSet<ImportPath>) {
        for p in self.params.iter().chain(&self.results).chain(&self.variadic) {
            p.ty.collect_imports(imports);
        }
    }
}

/// A parameter or result; `name` may be empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn unnamed(ty: Type) -> Self {
        Self::new("", ty)
    }
}

/// A struct literal field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    #[default]
    Both,
    Recv,
    Send,
}

/// Closed set of type kinds
///
/// The `kind` tag is always written on the wire, so a nested type never
/// has to be inferred from the shape of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    /// `pkg.Name`; `package` is the import path when declared elsewhere
    Named {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        package: Option<ImportPath>,
        name: String,
    },
    Pointer {
        elem: Box<Type>,
    },
    /// `[N]T`, or `[]T` when `len` is absent
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        len: Option<i64>,
        elem: Box<Type>,
    },
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Chan {
        #[serde(default)]
        dir: ChanDir,
        elem: Box<Type>,
    },
    Func {
        #[serde(default)]
        params: Vec<Parameter>,
        #[serde(default)]
        results: Vec<Parameter>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variadic: Option<Box<Parameter>>,
    },
    Struct {
        #[serde(default)]
        fields: Vec<Field>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<Method>,
    },
    /// Builtins: `int`, `string`, `error`, ...
    Predeclared {
        name: String,
    },
}

impl Type {
    pub fn named(package: Option<&str>, name: impl Into<String>) -> Self {
        Type::Named {
            package: package.map(str::to_string),
            name: name.into(),
        }
    }

    pub fn predeclared(name: impl Into<String>) -> Self {
        Type::Predeclared { name: name.into() }
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer {
            elem: Box::new(elem),
        }
    }

    pub fn slice(elem: Type) -> Self {
        Type::Array {
            len: None,
            elem: Box::new(elem),
        }
    }

    pub fn array(len: i64, elem: Type) -> Self {
        Type::Array {
            len: Some(len),
            elem: Box::new(elem),
        }
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn chan(dir: ChanDir, elem: Type) -> Self {
        Type::Chan {
            dir,
            elem: Box::new(elem),
        }
    }

    /// Go source spelling of the type
    ///
    /// # Arguments
    /// * `qualifiers` - import path -> package qualifier used in the generated file
    /// * `local_package` - import path whose types are written unqualified
    ///
    /// # Example
    /// ```ignore
    /// let ty = Type::slice(Type::pointer(Type::named(Some("net/http"), "Request")));
    /// assert_eq!(ty.render(&HashMap::new(), ""), "[]*http.Request");
    /// ```
    pub fn render(&self, qualifiers: &HashMap<String, String>, local_package: &str) -> String {
        match self {
            Type::Named { package, name } => match package.as_deref() {
                None => name.clone(),
                Some(pkg) if pkg == local_package => name.clone(),
                Some(pkg) => {
                    let qualifier = qualifiers
                        .get(pkg)
                        .map(String::as_str)
                        .unwrap_or_else(|| last_path_component(pkg));
                    format!("{}.{}", qualifier, name)
                }
            },
            Type::Pointer { elem } => format!("*{}", elem.render(qualifiers, local_package)),
            Type::Array { len, elem } => {
                let elem = elem.render(qualifiers, local_package);
                match len {
                    Some(n) => format!("[{}]{}", n, elem),
                    None => format!("[]{}", elem),
                }
            }
            Type::Map { key, value } => format!(
                "map[{}]{}",
                key.render(qualifiers, local_package),
                value.render(qualifiers, local_package)
            ),
            Type::Chan { dir, elem } => {
                let elem = elem.render(qualifiers, local_package);
                match dir {
                    ChanDir::Both => format!("chan {}", elem),
                    ChanDir::Recv => format!("<-chan {}", elem),
                    ChanDir::Send => format!("chan<- {}", elem),
                }
            }
            Type::Func {
                params,
                results,
                variadic,
            } => format!(
                "func{}",
                render_signature(
                    params,
                    variadic.as_deref(),
                    results,
                    qualifiers,
                    local_package
                )
            ),
            Type::Struct { fields } => {
                if fields.is_empty() {
                    return "struct{}".to_string();
                }
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, f.ty.render(qualifiers, local_package)))
                    .collect();
                format!("struct{{ {} }}", fields.join("; "))
            }
            Type::Interface { methods } => {
                if methods.is_empty() {
                    return "interface{}".to_string();
                }
                let methods: Vec<String> = methods
                    .iter()
                    .map(|m| format!("{}{}", m.name, m.signature(qualifiers, local_package)))
                    .collect();
                format!("interface{{ {} }}", methods.join("; "))
            }
            Type::Predeclared { name } => name.clone(),
        }
    }

    fn collect_imports(&self, imports: &mut BTreeSet<ImportPath>) {
        match self {
            Type::Named { package, .. } => {
                if let Some(pkg) = package {
                    imports.insert(pkg.clone());
                }
            }
            Type::Pointer { elem } | Type::Array { elem, .. } | Type::Chan { elem, .. } => {
                elem.collect_imports(imports)
            }
            Type::Map { key, value } => {
                key.collect_imports(imports);
                value.collect_imports(imports);
            }
            Type::Func {
                params,
                results,
                variadic,
            } => {
                for p in params.iter().chain(results) {
                    p.ty.collect_imports(imports);
                }
                if let Some(v) = variadic {
                    v.ty.collect_imports(imports);
                }
            }
            Type::Struct { fields } => {
                for f in fields {
                    f.ty.collect_imports(imports);
                }
            }
            Type::Interface { methods } => {
                for m in methods {
                    m.collect_imports(imports);
                }
            }
            Type::Predeclared { .. } => {}
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&HashMap::new(), ""))
    }
}

fn last_path_component(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn render_signature(
    params: &[Parameter],
    variadic: Option<&Parameter>,
    results: &[Parameter],
    qualifiers: &HashMap<String, String>,
    local_package: &str,
) -> String {
    let render_param = |p: &Parameter, prefix: &str| {
        let ty = p.ty.render(qualifiers, local_package);
        if p.name.is_empty() {
            format!("{}{}", prefix, ty)
        } else {
            format!("{} {}{}", p.name, prefix, ty)
        }
    };

    let mut args: Vec<String> = params.iter().map(|p| render_param(p, "")).collect();
    if let Some(v) = variadic {
        args.push(render_param(v, "..."));
    }

    let rets: Vec<String> = results.iter().map(|p| render_param(p, "")).collect();
    let single_unnamed = results.len() == 1 && results[0].name.is_empty();
    match rets.len() {
        0 => format!("({})", args.join(", ")),
        1 if single_unnamed => format!("({}) {}", args.join(", "), rets[0]),
        _ => format!("({}) ({})", args.join(", "), rets.join(", ")),
    }
}

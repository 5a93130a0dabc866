// Probe Program Synthesizer
// Renders the Go program that reflects on the requested interfaces

use askama::Template;

use crate::application::constants::{SENTINEL, TARGET_ALIAS};
use crate::error::{ReflectError, Result};

/// Inputs of one probe program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Import path of the package holding the interfaces
    pub import_path: String,
    /// Exported interface names, in output order. Not checked for existence.
    pub symbols: Vec<String>,
}

impl ProbeRequest {
    pub fn new(import_path: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            import_path: import_path.into(),
            symbols,
        }
    }
}

/// One extraction entry of the generated program
struct SymbolEntry {
    name: String,
    literal: String,
}

/// The probe program
///
/// For each symbol, in order, the program takes the type of a nil pointer to
/// the interface, dereferences it and hands it to the model package. The
/// package name is `path.Base(importPath)`, which is wrong when the package
/// clause differs from the last path component.
///
/// The model tree is converted to the decoder's tagged JSON shape inside the
/// probe; the model package's own field names never reach the wire.
#[derive(Template)]
#[template(
    ext = "txt",
    source = r#"
package main

import (
	"encoding/json"
	"fmt"
	"os"
	"path"
	"reflect"

	model {{ model_import }}

	{{ alias }} {{ import_path }}
)

func main() {
	its := []struct {
		sym string
		typ reflect.Type
	}{
{% for sym in symbols %}		{ {{ sym.literal }}, reflect.TypeOf((*{{ alias }}.{{ sym.name }})(nil)).Elem()},
{% endfor %}	}
	pkg := &model.Package{
		// NOTE: This behaves contrary to documented behaviour if the
		// package name is not the final component of the import path.
		// The reflect package doesn't expose the package name, though.
		Name: path.Base({{ import_path }}),
	}

	for _, it := range its {
		intf, err := model.InterfaceFromInterfaceType(it.typ)
		if err != nil {
			fmt.Fprintf(os.Stderr, "Reflection: %v\n", err)
			os.Exit(1)
		}
		intf.Name = it.sym
		pkg.Interfaces = append(pkg.Interfaces, intf)
	}

	fmt.Println("\n{{ sentinel }}")

	if err := json.NewEncoder(os.Stdout).Encode(encodePackage(pkg)); err != nil {
		fmt.Fprintf(os.Stderr, "json encode: %v\n", err)
		os.Exit(1)
	}
}

// Wire shape: lowercase field names, every type tagged with "kind".

type object = map[string]interface{}

func encodePackage(pkg *model.Package) object {
	intfs := make([]interface{}, 0, len(pkg.Interfaces))
	for _, intf := range pkg.Interfaces {
		methods := make([]interface{}, 0, len(intf.Methods))
		for _, m := range intf.Methods {
			methods = append(methods, encodeSignature(object{"name": m.Name}, m.In, m.Out, m.Variadic))
		}
		intfs = append(intfs, object{"name": intf.Name, "methods": methods})
	}
	return object{"name": pkg.Name, "interfaces": intfs}
}

func encodeSignature(o object, in, out []*model.Parameter, variadic *model.Parameter) object {
	o["params"] = encodeParams(in)
	o["results"] = encodeParams(out)
	if variadic != nil {
		o["variadic"] = encodeParam(variadic)
	}
	return o
}

func encodeParams(ps []*model.Parameter) []interface{} {
	out := make([]interface{}, 0, len(ps))
	for _, p := range ps {
		out = append(out, encodeParam(p))
	}
	return out
}

func encodeParam(p *model.Parameter) object {
	return object{"name": p.Name, "type": encodeType(p.Type)}
}

func encodeType(t model.Type) object {
	switch t := t.(type) {
	case model.PredeclaredType:
		return object{"kind": "predeclared", "name": string(t)}
	case *model.PredeclaredType:
		return object{"kind": "predeclared", "name": string(*t)}
	case *model.NamedType:
		o := object{"kind": "named", "name": t.Type}
		if t.Package != "" {
			o["package"] = t.Package
		}
		return o
	case *model.PointerType:
		return object{"kind": "pointer", "elem": encodeType(t.Type)}
	case *model.ArrayType:
		o := object{"kind": "array", "elem": encodeType(t.Type)}
		if t.Len >= 0 {
			o["len"] = t.Len
		}
		return o
	case *model.MapType:
		return object{"kind": "map", "key": encodeType(t.Key), "value": encodeType(t.Value)}
	case *model.ChanType:
		dir := "both"
		switch t.Dir {
		case model.RecvDir:
			dir = "recv"
		case model.SendDir:
			dir = "send"
		}
		return object{"kind": "chan", "dir": dir, "elem": encodeType(t.Type)}
	case *model.FuncType:
		return encodeSignature(object{"kind": "func"}, t.In, t.Out, t.Variadic)
	}
	fmt.Fprintf(os.Stderr, "Reflection: unsupported type %T\n", t)
	os.Exit(1)
	return nil
}
"#
)]
struct ProbeProgram<'a> {
    model_import: String,
    alias: &'a str,
    import_path: String,
    symbols: Vec<SymbolEntry>,
    sentinel: &'a str,
}

/// Spell `s` as a Go interpreted string literal
///
/// JSON string syntax is a subset of Go's, so serde_json's encoding is reused.
fn go_quote(s: &str) -> Result<String> {
    serde_json::to_string(s).map_err(|e| ReflectError::Render(e.to_string()))
}

/// Render the probe program source
///
/// Identical inputs always produce byte-identical output.
///
/// # Arguments
/// * `request` - Import path and symbols to reflect on
/// * `model_import` - Import path of the Go model package linked into the probe
///
/// # Errors
/// - ReflectError::Render if the template cannot be expanded
pub fn synthesize(request: &ProbeRequest, model_import: &str) -> Result<String> {
    let symbols = request
        .symbols
        .iter()
        .map(|name| {
            Ok(SymbolEntry {
                name: name.clone(),
                literal: go_quote(name)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let program = ProbeProgram {
        model_import: go_quote(model_import)?,
        alias: TARGET_ALIAS,
        import_path: go_quote(&request.import_path)?,
        symbols,
        sentinel: SENTINEL,
    };

    Ok(program.render()?)
}

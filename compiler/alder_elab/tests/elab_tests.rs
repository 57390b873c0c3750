//! End-to-end elaboration scenarios: the full pipeline from source
//! text to symbols, types, and constant values.

use alder_diagnostic::DiagCode;
use alder_elab::{
    builtin, BindContext, Compilation, ScopeId, SymbolId, SymbolKind, Type,
};
use alder_num::{ConstantValue, Logic, SvInt};
use alder_source::{SourceManager, SourceRange};
use alder_syntax::{Name, StringInterner};

struct Fixture {
    comp: Compilation,
    interner: &'static StringInterner,
    #[allow(dead_code)]
    sources: SourceManager,
}

fn compile(text: &str) -> Fixture {
    let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
    let sources = SourceManager::new();
    let comp = alder_elab::compile_str(&sources, text, interner);
    Fixture {
        comp,
        interner,
        sources,
    }
}

impl Fixture {
    fn name(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    /// Body scope of the sole root instance.
    fn root_body(&self) -> ScopeId {
        let roots = self.comp.root_instances();
        assert!(!roots.is_empty(), "no root instances");
        match &self.comp.symbol(roots[0]).kind {
            SymbolKind::Instance { body, .. } => *body,
            other => panic!("root is not an instance: {other:?}"),
        }
    }

    fn root_instance_named(&self, name: &str) -> SymbolId {
        let target = self.name(name);
        self.comp
            .root_instances()
            .into_iter()
            .find(|&id| self.comp.symbol(id).name == target)
            .unwrap_or_else(|| panic!("no root instance named {name}"))
    }

    fn body_of(&self, instance: SymbolId) -> ScopeId {
        match &self.comp.symbol(instance).kind {
            SymbolKind::Instance { body, .. } => *body,
            other => panic!("not an instance: {other:?}"),
        }
    }

    fn find_in(&self, scope: ScopeId, name: &str) -> SymbolId {
        self.comp
            .find(scope, self.name(name))
            .unwrap_or_else(|| panic!("'{name}' not found"))
    }

    fn param_i32(&self, scope: ScopeId, name: &str) -> Option<i32> {
        let sym = self.find_in(scope, name);
        match self.comp.parameter_value(sym) {
            ConstantValue::Integer(v) => v.as_i32(),
            _ => None,
        }
    }

    fn assert_clean(&self) {
        let errors: Vec<_> = self
            .comp
            .diagnostics()
            .collect()
            .into_iter()
            .filter(|d| d.is_error())
            .map(|d| (d.code, d.message()))
            .collect();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }
}

// === Scenario: parameter-driven packed dimension ===

#[test]
fn parameter_and_packed_range() {
    let f = compile("module m; parameter int W = 8; logic [W-1:0] a; endmodule");
    f.assert_clean();

    let body = f.root_body();
    assert_eq!(f.param_i32(body, "W"), Some(8));

    let a = f.find_in(body, "a");
    let ctx = BindContext::new(&f.comp, body);
    let ty = f.comp.value_type(a, &ctx);
    match f.comp.type_kind(ty) {
        Type::PackedArray { element, range } => {
            assert_eq!(element, builtin::LOGIC);
            assert_eq!(range.left, 7);
            assert_eq!(range.right, 0);
        }
        other => panic!("expected packed array, got {other:?}"),
    }
    assert_eq!(f.comp.type_bit_width(ty), Some(8));
}

// === Scenario: wildcard import of hoisted enum members ===

#[test]
fn wildcard_import_resolves_enum_member() {
    let f = compile(
        "package p; enum { A = 1, B, C } e; endpackage\nmodule m; import p::*; endmodule",
    );
    f.assert_clean();

    let body = f.root_body();
    // Wildcard invisibility: no direct map entry for B.
    assert!(f.comp.find(body, f.name("B")).is_none());

    let found = f
        .comp
        .lookup_unqualified(body, f.name("B"), SourceRange::NONE)
        .expect("B resolves through the wildcard import");
    assert!(matches!(
        f.comp.symbol(found).kind,
        SymbolKind::EnumValue(_)
    ));
    match f.comp.enum_value(found) {
        ConstantValue::Integer(v) => assert_eq!(v.as_i32(), Some(2)),
        other => panic!("expected integer, got {other:?}"),
    }
}

#[test]
fn wildcard_imports_never_appear_in_members() {
    let f = compile("package p; parameter int K = 1; endpackage\nmodule m; import p::*; endmodule");
    let body = f.root_body();
    for &member in &f.comp.scope(body).members {
        assert!(!matches!(
            f.comp.symbol(member).kind,
            SymbolKind::WildcardImport { .. }
        ));
    }
    assert!(!f.comp.scope(body).wildcard_imports.is_empty());
}

// === Scenario: non-positive packed bound ===

#[test]
fn zero_parameter_makes_negative_bound() {
    let f = compile("module m; parameter int N = 0; logic [N-1:0] a; endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::ValueMustBePositive));
}

// === Scenario: include resolution feeding elaboration ===

#[test]
fn include_participates_in_elaboration() {
    let dir = std::env::temp_dir().join("alder_elab_inc");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("params.svh"),
        "package hp; parameter int K = 5; endpackage\n",
    )
    .unwrap();

    let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
    let sources = SourceManager::new();
    sources.add_user_directory(&dir);
    let comp = alder_elab::compile_str(
        &sources,
        "`include \"params.svh\"\nmodule m; localparam int L = hp::K + 1; endmodule",
        interner,
    );
    assert!(
        !comp.diagnostics().has_errors(),
        "{:?}",
        comp.diagnostics().collect()
    );

    let roots = comp.root_instances();
    let SymbolKind::Instance { body, .. } = comp.symbol(roots[0]).kind else {
        panic!("no instance");
    };
    let l = comp.find(body, interner.intern("L")).unwrap();
    match comp.parameter_value(l) {
        ConstantValue::Integer(v) => assert_eq!(v.as_i32(), Some(6)),
        other => panic!("expected 6, got {other:?}"),
    }
}

// === Parameter overrides ===

#[test]
fn parameter_override_from_instantiation() {
    let f = compile(
        "module child #(parameter int WIDTH = 8) (); endmodule\n\
         module top; child #(.WIDTH(16)) a (); child b (); endmodule",
    );
    f.assert_clean();

    let top = f.root_instance_named("top");
    let top_body = f.body_of(top);
    let a = f.find_in(top_body, "a");
    let b = f.find_in(top_body, "b");
    assert_eq!(f.param_i32(f.body_of(a), "WIDTH"), Some(16));
    assert_eq!(f.param_i32(f.body_of(b), "WIDTH"), Some(8));
}

#[test]
fn ordered_parameter_override() {
    let f = compile(
        "module child #(parameter int A = 1, parameter int B = 2) (); endmodule\n\
         module top; child #(10, 20) u (); endmodule",
    );
    f.assert_clean();
    let top_body = f.body_of(f.root_instance_named("top"));
    let u_body = f.body_of(f.find_in(top_body, "u"));
    assert_eq!(f.param_i32(u_body, "A"), Some(10));
    assert_eq!(f.param_i32(u_body, "B"), Some(20));
}

#[test]
fn unknown_parameter_name_diagnosed() {
    let f = compile(
        "module child #(parameter int A = 1) (); endmodule\n\
         module top; child #(.NOPE(3)) u (); endmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::ParameterDoesNotExist));
}

#[test]
fn parameter_depending_on_parameter() {
    let f = compile(
        "module m; parameter int W = 8; localparam int BYTES = W / 8 + 1; endmodule",
    );
    f.assert_clean();
    assert_eq!(f.param_i32(f.root_body(), "BYTES"), Some(2));
}

#[test]
fn self_referential_parameter_is_bad() {
    let f = compile("module m; parameter int P = P + 1; endmodule");
    let body = f.root_body();
    let p = f.find_in(body, "P");
    assert!(f.comp.parameter_value(p).is_bad());
    assert!(f.comp.diagnostics().has_errors());
}

// === Ports and connections ===

#[test]
fn ansi_ports_have_internal_symbols() {
    let f = compile(
        "module m (input logic clk, output logic [7:0] data); endmodule",
    );
    f.assert_clean();
    let inst = f.root_instance_named("m");
    let SymbolKind::Instance { ports, body, .. } = &f.comp.symbol(inst).kind else {
        panic!("not an instance");
    };
    assert_eq!(ports.len(), 2);

    // The internal symbol, not the port, is what lookup finds.
    let clk = f.find_in(*body, "clk");
    assert!(matches!(f.comp.symbol(clk).kind, SymbolKind::Net { .. }));

    let ctx = BindContext::new(&f.comp, *body);
    let data = f.find_in(*body, "data");
    assert_eq!(f.comp.type_bit_width(f.comp.value_type(data, &ctx)), Some(8));
}

#[test]
fn named_connections_attach_to_ports() {
    let f = compile(
        "module child (input logic a, output logic b); endmodule\n\
         module top;\n  logic x, y;\n  child u (.a(x), .b(y));\nendmodule",
    );
    f.assert_clean();
    let top_body = f.body_of(f.root_instance_named("top"));
    let u = f.find_in(top_body, "u");
    let SymbolKind::Instance { ports, .. } = &f.comp.symbol(u).kind else {
        panic!("not an instance");
    };
    for &port in ports {
        assert!(
            f.comp.port_connection(port).is_some(),
            "port should be connected"
        );
    }
}

#[test]
fn bad_port_name_diagnosed() {
    let f = compile(
        "module child (input logic a); endmodule\n\
         module top; logic x; child u (.nope(x)); endmodule",
    );
    assert!(f.comp.diagnostics().contains(DiagCode::PortDoesNotExist));
}

#[test]
fn too_many_ordered_connections_diagnosed() {
    let f = compile(
        "module child (input logic a); endmodule\n\
         module top; logic x, y; child u (x, y); endmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::TooManyPortConnections));
}

#[test]
fn duplicate_named_connection_diagnosed() {
    let f = compile(
        "module child (input logic a); endmodule\n\
         module top; logic x; child u (.a(x), .a(x)); endmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::DuplicatePortConnection));
}

#[test]
fn non_ansi_ports_merge_body_declarations() {
    let f = compile(
        "module m (a, b);\n  input logic a;\n  output logic b;\nendmodule",
    );
    f.assert_clean();
    let inst = f.root_instance_named("m");
    let SymbolKind::Instance { ports, body, .. } = &f.comp.symbol(inst).kind else {
        panic!("not an instance");
    };
    assert_eq!(ports.len(), 2);
    let a_port = ports[0];
    assert!(matches!(
        f.comp.symbol(a_port).kind,
        SymbolKind::Port(ref data) if data.internal_symbol.get().is_some()
    ));
    let _ = f.find_in(*body, "a");
}

// === Lookup semantics ===

#[test]
fn duplicate_name_keeps_first_and_diagnoses() {
    let f = compile("module m; logic dup; logic dup; endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::DuplicateDefinition));

    let body = f.root_body();
    // Both stay in the member list; the first wins lookup.
    let dups = f
        .comp
        .scope(body)
        .members
        .iter()
        .filter(|&&m| f.comp.symbol(m).name == f.name("dup"))
        .count();
    assert_eq!(dups, 2);
    let found = f.find_in(body, "dup");
    assert_eq!(f.comp.scope(body).members[0], found);
}

#[test]
fn find_respects_scope_uniqueness() {
    let f = compile("module m; logic a; logic b; endmodule");
    let body = f.root_body();
    let a = f.find_in(body, "a");
    assert_eq!(f.comp.symbol(a).name, f.name("a"));
    assert!(f.comp.scope(body).members.contains(&a));
    assert!(f.comp.find(body, f.name("zzz")).is_none());
}

#[test]
fn unqualified_lookup_recurses_to_parent() {
    let f = compile(
        "package p; parameter int K = 7; endpackage\n\
         module m;\n  import p::K;\n  localparam int L = K; \nendmodule",
    );
    f.assert_clean();
    assert_eq!(f.param_i32(f.root_body(), "L"), Some(7));
}

#[test]
fn ambiguous_wildcard_import_reports_all_candidates() {
    let f = compile(
        "package p1; parameter int K = 1; endpackage\n\
         package p2; parameter int K = 2; endpackage\n\
         module m; import p1::*; import p2::*; localparam int L = K; endmodule",
    );
    let diag = f
        .comp
        .diagnostics()
        .collect()
        .into_iter()
        .find(|d| d.code == DiagCode::AmbiguousWildcardImport)
        .expect("ambiguity diagnosed");
    // Every candidate shows up as a note naming its package.
    assert_eq!(diag.notes.len(), 2);
    assert!(diag.notes[0].0.contains("p1"));
    assert!(diag.notes[1].0.contains("p2"));
}

#[test]
fn unknown_package_diagnosed() {
    let f = compile("module m; localparam int L = nopkg::K; endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::UnknownPackage));
}

#[test]
fn unknown_package_member_diagnosed() {
    let f = compile(
        "package p; parameter int K = 1; endpackage\n\
         module m; import p::MISSING; localparam int L = MISSING; endmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::UnknownPackageMember));
}

#[test]
fn undeclared_identifier_diagnosed() {
    let f = compile("module m; localparam int L = nothing_here; endmodule");
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::UndeclaredIdentifier));
}

#[test]
fn declaration_after_wildcard_use_warns() {
    let f = compile(
        "package p; parameter int K = 1; endpackage\n\
         module m;\n  import p::*;\n  localparam int USE = K;\n  logic K;\nendmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::ImportNameCollision));
}

// === Hierarchy and qualified names ===

#[test]
fn hierarchical_member_lookup() {
    let f = compile(
        "module child; parameter int INNER = 3; endmodule\n\
         module top; child u (); localparam int L = u.INNER; endmodule",
    );
    f.assert_clean();
    let top_body = f.body_of(f.root_instance_named("top"));
    assert_eq!(f.param_i32(top_body, "L"), Some(3));
}

#[test]
fn not_a_member_diagnosed() {
    let f = compile(
        "module child; endmodule\n\
         module top; child u (); localparam int L = u.missing; endmodule",
    );
    assert!(f.comp.diagnostics().contains(DiagCode::NotAMember));
}

// === Interfaces and modports ===

#[test]
fn interface_with_modport_elaborates() {
    let f = compile(
        "interface bus_if;\n  logic req, gnt;\n  modport master (output req, input gnt);\nendinterface\n\
         module top; bus_if bus (); endmodule",
    );
    f.assert_clean();

    let top_body = f.body_of(f.root_instance_named("top"));
    let bus = f.find_in(top_body, "bus");
    let bus_body = f.body_of(bus);
    let master = f.find_in(bus_body, "master");
    assert!(matches!(
        f.comp.symbol(master).kind,
        SymbolKind::Modport { .. }
    ));

    // inst.modport.signal resolves through the modport scope.
    let req = f
        .comp
        .lookup_member(master, f.name("req"), SourceRange::NONE)
        .expect("modport exposes req");
    assert!(matches!(
        f.comp.symbol(req).kind,
        SymbolKind::ModportPort { .. }
    ));

    // A signal the modport does not expose is an access violation.
    assert!(f
        .comp
        .lookup_member(master, f.name("nothere"), SourceRange::NONE)
        .is_none());
    assert!(f.comp.diagnostics().contains(DiagCode::AccessViolation));
}

// === Types ===

#[test]
fn typedef_resolves_through_alias() {
    let f = compile(
        "module m;\n  typedef logic [3:0] nibble_t;\n  nibble_t n;\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    let ctx = BindContext::new(&f.comp, body);
    let n = f.find_in(body, "n");
    assert_eq!(f.comp.type_bit_width(f.comp.value_type(n, &ctx)), Some(4));
}

#[test]
fn unpacked_dimension_flavors() {
    let f = compile(
        "module m;\n  int fixed_a [16];\n  int dyn_a [];\n  int q_a [$];\n  int assoc_a [*];\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    let ctx = BindContext::new(&f.comp, body);

    let ty = |name: &str| f.comp.type_kind(f.comp.value_type(f.find_in(body, name), &ctx));
    assert!(matches!(ty("fixed_a"), Type::FixedArray { range, .. } if range.width() == 16));
    assert!(matches!(ty("dyn_a"), Type::DynamicArray { .. }));
    assert!(matches!(ty("q_a"), Type::Queue { .. }));
    assert!(matches!(ty("assoc_a"), Type::AssociativeArray { .. }));
}

#[test]
fn enum_implicit_and_explicit_values() {
    let f = compile(
        "module m;\n  typedef enum logic [1:0] { IDLE, RUN = 2, DONE } state_t;\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();

    let value = |name: &str| {
        let wrapper = f.find_in(body, name);
        let sym = f.comp.unwrap_transparent(wrapper);
        match f.comp.enum_value(sym) {
            ConstantValue::Integer(v) => v.as_i32(),
            _ => None,
        }
    };
    assert_eq!(value("IDLE"), Some(0));
    assert_eq!(value("RUN"), Some(2));
    assert_eq!(value("DONE"), Some(3));

    // Enum values take the base type's width.
    let idle = f.comp.unwrap_transparent(f.find_in(body, "IDLE"));
    match f.comp.enum_value(idle) {
        ConstantValue::Integer(v) => assert_eq!(v.width(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn packed_struct_width() {
    let f = compile(
        "module m;\n  struct packed { logic [7:0] hi; logic [7:0] lo; } word;\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    let ctx = BindContext::new(&f.comp, body);
    let word = f.find_in(body, "word");
    assert_eq!(f.comp.type_bit_width(f.comp.value_type(word, &ctx)), Some(16));
}

// === Constant evaluation through the pipeline ===

#[test]
fn constant_function_call_in_parameter() {
    let f = compile(
        "module m;\n  function int double_it(int x);\n    return x * 2;\n  endfunction\n  localparam int P = double_it(21);\nendmodule",
    );
    f.assert_clean();
    assert_eq!(f.param_i32(f.root_body(), "P"), Some(42));
}

#[test]
fn array_query_system_functions() {
    let f = compile(
        "module m;\n  logic [7:4] v;\n  int arr [0:15];\n  localparam int L = $left(v);\n  localparam int R = $right(v);\n  localparam int LO = $low(v);\n  localparam int HI = $high(v);\n  localparam int S = $size(v);\n  localparam int INC = $increment(v);\n  localparam int AINC = $increment(arr);\n  localparam int ASZ = $size(arr);\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    assert_eq!(f.param_i32(body, "L"), Some(7));
    assert_eq!(f.param_i32(body, "R"), Some(4));
    assert_eq!(f.param_i32(body, "LO"), Some(4));
    assert_eq!(f.param_i32(body, "HI"), Some(7));
    assert_eq!(f.param_i32(body, "S"), Some(4));
    assert_eq!(f.param_i32(body, "INC"), Some(1));
    // Ascending unpacked range: left < right.
    assert_eq!(f.param_i32(body, "AINC"), Some(-1));
    assert_eq!(f.param_i32(body, "ASZ"), Some(16));
}

#[test]
fn array_query_on_plain_integral() {
    // A plain integral answers as its implied [w-1:0] range.
    let f = compile(
        "module m;\n  int x;\n  localparam int HI = $high(x);\n  localparam int S = $size(x);\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    assert_eq!(f.param_i32(body, "HI"), Some(31));
    assert_eq!(f.param_i32(body, "S"), Some(32));
}

#[test]
fn array_query_on_dynamic_shape_is_not_constant() {
    let f = compile(
        "module m;\n  int dyn_a [];\n  localparam int S = $size(dyn_a);\nendmodule",
    );
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::ExpressionNotConstant));
    let s = f.find_in(f.root_body(), "S");
    assert!(f.comp.parameter_value(s).is_bad());
}

#[test]
fn enum_first_last_num_methods() {
    let f = compile(
        "module m;\n  typedef enum logic [3:0] { IDLE = 1, RUN = 4, DONE = 9 } state_t;\n  state_t s;\n  localparam state_t F = s.first();\n  localparam state_t LA = s.last();\n  localparam int N = s.num();\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    assert_eq!(f.param_i32(body, "F"), Some(1));
    assert_eq!(f.param_i32(body, "LA"), Some(9));
    assert_eq!(f.param_i32(body, "N"), Some(3));
}

#[test]
fn enum_method_on_non_enum_diagnosed() {
    let f = compile("module m; int x; localparam int N = x.num(); endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::NotASubroutine));
}

#[test]
fn clog2_and_bits_system_functions() {
    let f = compile(
        "module m;\n  localparam int ADDR = $clog2(16);\n  localparam int ZERO = $clog2(1);\n  logic [7:0] v;\n  localparam int W = $bits(v);\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    assert_eq!(f.param_i32(body, "ADDR"), Some(4));
    assert_eq!(f.param_i32(body, "ZERO"), Some(0));
    assert_eq!(f.param_i32(body, "W"), Some(8));
}

#[test]
fn four_state_propagates_into_parameters() {
    let f = compile("module m; localparam logic [3:0] P = 4'b10xz; endmodule");
    let body = f.root_body();
    let p = f.find_in(body, "P");
    match f.comp.parameter_value(p) {
        ConstantValue::Integer(v) => {
            assert!(v.has_unknown());
            assert_eq!(v.get_bit(1), Logic::X);
            assert_eq!(v.get_bit(0), Logic::Z);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn division_by_zero_parameter_is_all_x() {
    let f = compile("module m; localparam logic [7:0] P = 8'd1 / 8'd0; endmodule");
    let body = f.root_body();
    let p = f.find_in(body, "P");
    match f.comp.parameter_value(p) {
        ConstantValue::Integer(v) => {
            assert!((0..8).all(|i| v.get_bit(i) == Logic::X));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn value_out_of_range_in_dimension() {
    let f = compile("module m; logic [5000000000:0] a; endmodule");
    let occurrences = f
        .comp
        .diagnostics()
        .collect()
        .iter()
        .filter(|d| d.code == DiagCode::ValueOutOfRange)
        .count();
    assert_eq!(occurrences, 1);
}

#[test]
fn continuous_assign_binds_and_checks_lvalue() {
    let f = compile("module m; logic a, b; assign a = b; endmodule");
    f.assert_clean();

    let f2 = compile("module m; logic a; assign 5 = a; endmodule");
    assert!(f2
        .comp
        .diagnostics()
        .contains(DiagCode::ExpressionNotAssignable));
}

#[test]
fn conditional_with_unknown_selector_merges() {
    let f = compile(
        "module m; localparam logic [1:0] P = 1'bx ? 2'b10 : 2'b11; endmodule",
    );
    let body = f.root_body();
    let p = f.find_in(body, "P");
    match f.comp.parameter_value(p) {
        ConstantValue::Integer(v) => {
            assert_eq!(v.get_bit(1), Logic::One); // agree
            assert_eq!(v.get_bit(0), Logic::X); // disagree
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn select_of_parameter_value() {
    let f = compile(
        "module m;\n  localparam logic [7:0] V = 8'hA5;\n  localparam logic B = V[0];\n  localparam logic [3:0] HI = V[7:4];\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    let b = f.find_in(body, "B");
    match f.comp.parameter_value(b) {
        ConstantValue::Integer(v) => assert_eq!(v.get_bit(0), Logic::One),
        other => panic!("unexpected {other:?}"),
    }
    let hi = f.find_in(body, "HI");
    match f.comp.parameter_value(hi) {
        ConstantValue::Integer(v) => assert_eq!(v.as_u64(), Some(0xA)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn concat_and_replication_constants() {
    let f = compile(
        "module m;\n  localparam logic [7:0] C = {4'h5, 4'hA};\n  localparam logic [5:0] R = {3{2'b01}};\nendmodule",
    );
    f.assert_clean();
    let body = f.root_body();
    assert_eq!(
        f.comp
            .parameter_value(f.find_in(body, "C"))
            .integer()
            .and_then(SvInt::as_u64),
        Some(0x5A)
    );
    assert_eq!(
        f.comp
            .parameter_value(f.find_in(body, "R"))
            .integer()
            .and_then(SvInt::as_u64),
        Some(0b010101)
    );
}

// === Definitions and roots ===

#[test]
fn instantiated_modules_are_not_roots() {
    let f = compile(
        "module leaf; endmodule\n\
         module mid; leaf u (); endmodule\n\
         module top; mid u (); endmodule",
    );
    f.assert_clean();
    let roots = f.comp.root_instances();
    assert_eq!(roots.len(), 1);
    assert_eq!(f.comp.symbol(roots[0]).name, f.name("top"));
}

#[test]
fn unknown_definition_diagnosed() {
    let f = compile("module top; no_such_mod u (); endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::UnknownDefinition));
}

#[test]
fn duplicate_definition_diagnosed() {
    let f = compile("module m; endmodule\nmodule m; endmodule");
    assert!(f.comp.diagnostics().contains(DiagCode::DuplicateDefinition));
}

#[test]
fn recursive_instantiation_bounded() {
    let f = compile("module loop_mod; loop_mod u (); endmodule");
    // The depth limit cuts the recursion and reports it.
    assert!(f
        .comp
        .diagnostics()
        .contains(DiagCode::MaxInstanceDepthExceeded));
}

// === Compilation-unit scope ===

#[test]
fn unit_scope_holds_file_level_declarations() {
    let f = compile("parameter int FILE_PARAM = 9;\nmodule m; localparam int L = FILE_PARAM; endmodule");
    f.assert_clean();
    assert_eq!(f.param_i32(f.root_body(), "L"), Some(9));

    // $unit members are reachable through the unit scope.
    let unit = f.comp.unit_scope();
    assert!(f.comp.find(unit, f.name("FILE_PARAM")).is_some());
}

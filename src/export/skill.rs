/// Prose instructions for regenerating an equivalent diagram schema from a
/// free-form architecture description. Emitted verbatim.
pub fn generation_skill() -> &'static str {
    SKILL
}

const SKILL: &str = r#"# Architecture Diagram Generation Skill

## Purpose

Turn a free-form architecture description into a layered, multi-view
diagram schema that renders as an interactive architecture map with threat
and authentication overlays.

## Inputs

- A text description of a system: its actors, services, data stores,
  model endpoints, agents, tools and the protocols between them.
- Optionally, a list of known risks or compliance concerns.

## Output

A single JSON5 document with this shape:

```json5
{
  system: "<System Name>",
  views: [
    {
      id: "logical",
      title: "Logical Architecture",
      description: "...",
      layers: [
        {
          id: "L1",
          title: "Presentation",
          color: "blue",
          threatCount: 2,
          components: [
            {
              id: "web",
              name: "Web Client",
              description: "...",
              icon: "globe",
              features: ["SSO login", "Streaming chat"],
              threats: ["LLM01:2025"],
              auth: "OIDC",
            },
          ],
        },
      ],
      connectors: [
        { from: "web", to: "gateway", path: { style: "grid", gridBreak: "50%" }, labels: [{ text: "HTTPS" }] },
      ],
    },
  ],
}
```

## Procedure

1. Name the system. The name becomes the prefix of every exported file.
2. Produce four views: `logical`, `process`, `physical` and `identity`.
   Each view groups components into three to six ordered layers, top to
   bottom in the direction requests flow.
3. Give every component an id that is unique within its view. The identity
   view may reuse ids from the logical view when it shows the same
   component.
4. List two to five short features per component.
5. Tag components with threat ids from the built-in catalogs:
   - LLM risks: `LLM01:2025` .. `LLM10:2025`
   - Agentic risks: `ASI01` .. `ASI10`
   - MCP risks: `MCP01` .. `MCP10`
6. Set each layer's `threatCount` to the number of distinct risks the layer
   should advertise.
7. Record the authentication method of each component in `auth`, and the
   credential carried over each connector in `authLabel`.
8. Connect components with connectors. Every `from` and `to` must name a
   component of the same view. Use `grid` paths between layers, `smooth`
   paths for feedback loops and `straight` paths inside a layer. Pin
   `startAnchor` / `endAnchor` sides only when the automatic choice crosses
   other boxes.

## Checks

- No duplicate component ids inside a view.
- No connector endpoint that names a missing component.
- Every threat id matches one of the catalog patterns above.
- Layer order matches the order the design document should read in.
"#;
